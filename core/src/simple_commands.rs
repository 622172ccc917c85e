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

//! Passthrough commands exposed to the hub in addition to the structured media-player commands.

const COMMON_COMMANDS: &[&str] = &[
    "OUTPUT_1",
    "OUTPUT_2",
    "OUTPUT_AUTO",
    "DIMMER_TOGGLE",
    "DIMMER_BRIGHT",
    "DIMMER_DIM",
    "DIMMER_DARK",
    "DIMMER_OFF",
    "TRIGGER1_ON",
    "TRIGGER1_OFF",
    "TRIGGER2_ON",
    "TRIGGER2_OFF",
    "TRIGGER3_ON",
    "TRIGGER3_OFF",
    "DELAY_UP",
    "DELAY_DOWN",
    "ECO_AUTO",
    "ECO_ON",
    "ECO_OFF",
    "SPEAKER_PRESET_1",
    "SPEAKER_PRESET_2",
    "QUICK_SELECT_1",
    "QUICK_SELECT_2",
    "QUICK_SELECT_3",
    "QUICK_SELECT_4",
    "QUICK_SELECT_5",
    "STATUS",
];

/// Parameter-setting commands only available over telnet.
const TELNET_COMMANDS: &[&str] = &[
    "DIALOG_ENHANCER_OFF",
    "DIALOG_ENHANCER_LOW",
    "DIALOG_ENHANCER_MEDIUM",
    "DIALOG_ENHANCER_HIGH",
    "DYNAMIC_EQ_ON",
    "DYNAMIC_EQ_OFF",
    "AUDYSSEY_LFC_ON",
    "AUDYSSEY_LFC_OFF",
    "DYNAMIC_VOLUME_OFF",
    "DYNAMIC_VOLUME_LIGHT",
    "DYNAMIC_VOLUME_MEDIUM",
    "DYNAMIC_VOLUME_HEAVY",
    "CHANNEL_LEVEL_ADJUST",
];

/// Remote-control codes only understood by Denon receivers.
const DENON_COMMANDS: &[&str] = &["REPEAT_TOGGLE", "RANDOM_TOGGLE", "PAGE_UP", "PAGE_DOWN"];

/// Returns the simple commands offered by a device flavor.
pub fn simple_commands_for(is_denon: bool, use_telnet: bool) -> Vec<String> {
    let mut commands: Vec<String> = COMMON_COMMANDS.iter().map(|c| c.to_string()).collect();
    if use_telnet {
        commands.extend(TELNET_COMMANDS.iter().map(|c| c.to_string()));
    }
    if is_denon {
        commands.extend(DENON_COMMANDS.iter().map(|c| c.to_string()));
    }
    commands
}
