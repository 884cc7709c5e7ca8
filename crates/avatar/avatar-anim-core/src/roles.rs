//! Semantic roles and their alias spellings.
//!
//! Asset pipelines name the same deformation differently (ARKit, Oculus visemes,
//! VRM, Mixamo, VRoid). Each role carries an ordered alias list; the prober takes
//! the first alias that matches.

use serde::{Deserialize, Serialize};

/// Mouth-shape categories cycled by the viseme synthesizer, in slot order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum VisemeKey {
    Aa,
    E,
    I,
    O,
    U,
    Pp,
    Ff,
    Th,
    Dd,
    Kk,
    Ch,
    Ss,
    Nn,
    Rr,
}

impl VisemeKey {
    pub const ALL: [VisemeKey; 14] = [
        VisemeKey::Aa,
        VisemeKey::E,
        VisemeKey::I,
        VisemeKey::O,
        VisemeKey::U,
        VisemeKey::Pp,
        VisemeKey::Ff,
        VisemeKey::Th,
        VisemeKey::Dd,
        VisemeKey::Kk,
        VisemeKey::Ch,
        VisemeKey::Ss,
        VisemeKey::Nn,
        VisemeKey::Rr,
    ];

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            VisemeKey::Aa => &["viseme_aa", "vrc.v_aa", "v_aa", "mouthA", "A"],
            VisemeKey::E => &["viseme_E", "vrc.v_e", "v_e", "mouthE", "E"],
            VisemeKey::I => &["viseme_I", "vrc.v_ih", "v_ih", "mouthI", "I"],
            VisemeKey::O => &["viseme_O", "vrc.v_oh", "v_oh", "mouthO", "O"],
            VisemeKey::U => &["viseme_U", "vrc.v_ou", "v_ou", "mouthU", "U"],
            VisemeKey::Pp => &["viseme_PP", "vrc.v_pp", "v_pp"],
            VisemeKey::Ff => &["viseme_FF", "vrc.v_ff", "v_ff"],
            VisemeKey::Th => &["viseme_TH", "vrc.v_th", "v_th"],
            VisemeKey::Dd => &["viseme_DD", "vrc.v_dd", "v_dd"],
            VisemeKey::Kk => &["viseme_kk", "vrc.v_kk", "v_kk"],
            VisemeKey::Ch => &["viseme_CH", "vrc.v_ch", "v_ch"],
            VisemeKey::Ss => &["viseme_SS", "vrc.v_ss", "v_ss"],
            VisemeKey::Nn => &["viseme_nn", "vrc.v_nn", "v_nn"],
            VisemeKey::Rr => &["viseme_RR", "vrc.v_rr", "v_rr"],
        }
    }
}

/// Every role the prober knows how to look for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viseme(VisemeKey),
    MouthOpen,
    BlinkLeft,
    BlinkRight,
    /// Single channel closing both eyes; used when a side-specific one is missing.
    BlinkBoth,
    Smile,
    Brow,
    HeadJoint,
    JawJoint,
    NeckJoint,
}

impl Role {
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Role::Viseme(v) => v.aliases(),
            Role::MouthOpen => &[
                "mouthOpen",
                "MouthOpen",
                "mouth_open",
                "Mouth_Open",
                "jawOpen",
                "JawOpen",
                "vrc.v_aa_open",
            ],
            Role::BlinkLeft => &[
                "eyeBlinkLeft",
                "eyeBlink_L",
                "EyeBlink_L",
                "Blink_L",
                "blink_left",
                "eyesClosedLeft",
                "vrc.blink_left",
            ],
            Role::BlinkRight => &[
                "eyeBlinkRight",
                "eyeBlink_R",
                "EyeBlink_R",
                "Blink_R",
                "blink_right",
                "eyesClosedRight",
                "vrc.blink_right",
            ],
            Role::BlinkBoth => &["blink", "Blink", "eyesClosed", "EyesClosed", "vrc.blink"],
            Role::Smile => &[
                "mouthSmile",
                "mouthSmileLeft",
                "mouthSmileRight",
                "mouthSmile_L",
                "mouthSmile_R",
                "smile",
                "Smile",
                "happy",
                "Fcl_MTH_Joy",
            ],
            Role::Brow => &[
                "browInnerUp",
                "browUp",
                "BrowUp",
                "browRaise",
                "brow_raise",
                "Brows_Up",
                "browOuterUpLeft",
            ],
            Role::HeadJoint => &[
                "Head",
                "head",
                "mixamorig:Head",
                "mixamorigHead",
                "J_Bip_C_Head",
                "Bip01_Head",
                "CC_Base_Head",
                "head_bone",
            ],
            Role::JawJoint => &[
                "Jaw",
                "jaw",
                "mixamorig:Jaw",
                "mixamorigJaw",
                "J_Bip_C_Jaw",
                "CC_Base_JawRoot",
                "jaw_bone",
            ],
            Role::NeckJoint => &[
                "Neck",
                "neck",
                "mixamorig:Neck",
                "mixamorigNeck",
                "J_Bip_C_Neck",
                "Bip01_Neck",
                "CC_Base_NeckTwist01",
                "neck_bone",
            ],
        }
    }
}
