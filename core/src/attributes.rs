// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Entity attribute records.
//!
//! The same record type is used for the last known attributes of an entity and for
//! a delta sent to the hub: `None` means "absent" in the former and "unchanged" in the latter.

use serde::Serialize;

use crate::definitions::{MediaPlayerState, RemoteState};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaPlayerAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<MediaPlayerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_mode_list: Option<Vec<String>>,
}

/// Overwrites `target` with `value` when a value is present.
fn merge_field<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if let Some(value) = value {
        *target = Some(value.clone());
    }
}

impl MediaPlayerAttributes {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies every present field of `delta` onto `self`.
    pub fn merge(&mut self, delta: &MediaPlayerAttributes) {
        merge_field(&mut self.state, &delta.state);
        merge_field(&mut self.volume, &delta.volume);
        merge_field(&mut self.muted, &delta.muted);
        merge_field(&mut self.media_image_url, &delta.media_image_url);
        merge_field(&mut self.media_title, &delta.media_title);
        merge_field(&mut self.media_artist, &delta.media_artist);
        merge_field(&mut self.media_album, &delta.media_album);
        merge_field(&mut self.media_type, &delta.media_type);
        merge_field(&mut self.source, &delta.source);
        merge_field(&mut self.source_list, &delta.source_list);
        merge_field(&mut self.sound_mode, &delta.sound_mode);
        merge_field(&mut self.sound_mode_list, &delta.sound_mode_list);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RemoteAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<RemoteState>,
}

impl RemoteAttributes {
    pub fn is_empty(&self) -> bool {
        self.state.is_none()
    }

    pub fn merge(&mut self, delta: &RemoteAttributes) {
        merge_field(&mut self.state, &delta.state);
    }
}

/// Attributes of one entity, tagged by entity kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityAttributes {
    MediaPlayer(MediaPlayerAttributes),
    Remote(RemoteAttributes),
}

impl EntityAttributes {
    pub fn is_empty(&self) -> bool {
        match self {
            EntityAttributes::MediaPlayer(attributes) => attributes.is_empty(),
            EntityAttributes::Remote(attributes) => attributes.is_empty(),
        }
    }

    /// Merges a delta of the same kind. Returns false if the kinds differ.
    pub fn merge(&mut self, delta: &EntityAttributes) -> bool {
        match (self, delta) {
            (EntityAttributes::MediaPlayer(current), EntityAttributes::MediaPlayer(delta)) => {
                current.merge(delta);
                true
            }
            (EntityAttributes::Remote(current), EntityAttributes::Remote(delta)) => {
                current.merge(delta);
                true
            }
            _ => false,
        }
    }
}
