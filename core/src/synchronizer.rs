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

//! Computes the minimal attribute delta between a receiver update and the
//! last known attributes of a hub entity.

use crate::attributes::{MediaPlayerAttributes, RemoteAttributes};
use crate::definitions::{MediaPlayerState, ReceiverState, RemoteState};
use crate::receiver::ReceiverUpdate;

/// Maps a receiver state to the media-player entity state.
pub fn media_player_state_from_receiver(state: ReceiverState) -> MediaPlayerState {
    match state {
        ReceiverState::On => MediaPlayerState::On,
        ReceiverState::Off => MediaPlayerState::Off,
        ReceiverState::Paused => MediaPlayerState::Paused,
        ReceiverState::Playing => MediaPlayerState::Playing,
        ReceiverState::Unavailable => MediaPlayerState::Unavailable,
        ReceiverState::Unknown => MediaPlayerState::Unknown,
    }
}

/// Maps a receiver state to the remote entity state. Any playback state means the remote is on.
pub fn remote_state_from_receiver(state: ReceiverState) -> RemoteState {
    match state {
        ReceiverState::On | ReceiverState::Playing | ReceiverState::Paused => RemoteState::On,
        ReceiverState::Off => RemoteState::Off,
        ReceiverState::Unavailable => RemoteState::Unavailable,
        ReceiverState::Unknown => RemoteState::Unknown,
    }
}

/// Returns `proposed` if it differs from `current` or `current` is absent.
fn changed<T: PartialEq + Clone>(current: &Option<T>, proposed: &Option<T>) -> Option<T> {
    match proposed {
        Some(value) if current.as_ref() != Some(value) => Some(value.clone()),
        _ => None,
    }
}

/// Filters a receiver update down to the media-player attributes that changed.
///
/// Sound-mode fields are only considered when `sound_mode_supported` is set. When the delta
/// switches the state to `Off`, the now-playing fields and the source are cleared as well.
pub fn filter_changed_media_player_attributes(
    current: &MediaPlayerAttributes,
    update: &ReceiverUpdate,
    sound_mode_supported: bool,
) -> MediaPlayerAttributes {
    let state = update.state.map(media_player_state_from_receiver);

    let mut delta = MediaPlayerAttributes {
        state: changed(&current.state, &state),
        volume: changed(&current.volume, &update.volume),
        muted: changed(&current.muted, &update.muted),
        media_image_url: changed(&current.media_image_url, &update.media_image_url),
        media_title: changed(&current.media_title, &update.media_title),
        media_artist: changed(&current.media_artist, &update.media_artist),
        media_album: changed(&current.media_album, &update.media_album),
        media_type: None,
        source: changed(&current.source, &update.source),
        source_list: changed(&current.source_list, &update.source_list),
        sound_mode: None,
        sound_mode_list: None,
    };

    if sound_mode_supported {
        delta.sound_mode = changed(&current.sound_mode, &update.sound_mode);
        delta.sound_mode_list = changed(&current.sound_mode_list, &update.sound_mode_list);
    }

    if delta.state == Some(MediaPlayerState::Off) {
        delta.media_image_url = Some(String::new());
        delta.media_album = Some(String::new());
        delta.media_artist = Some(String::new());
        delta.media_title = Some(String::new());
        delta.media_type = Some(String::new());
        delta.source = Some(String::new());
    }

    delta
}

/// Filters a receiver update down to the remote attributes that changed.
pub fn filter_changed_remote_attributes(current: &RemoteAttributes, update: &ReceiverUpdate) -> RemoteAttributes {
    let state = update.state.map(remote_state_from_receiver);
    RemoteAttributes {
        state: changed(&current.state, &state),
    }
}
