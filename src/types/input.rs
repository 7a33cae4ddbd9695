//! Device variants and their analog inputs

use serde::{Deserialize, Serialize};

use super::wire::usb;

/// Analog connector routed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Composite(u8),
    SVideo,
}

/// One selectable video input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoInput {
    pub name: &'static str,
    pub kind: InputKind,
}

const DUAL_INPUTS: &[VideoInput] = &[
    VideoInput { name: "Composite", kind: InputKind::Composite(0) },
    VideoInput { name: "S-Video", kind: InputKind::SVideo },
];

const QUAD_INPUTS: &[VideoInput] = &[
    VideoInput { name: "Composite 0", kind: InputKind::Composite(0) },
    VideoInput { name: "Composite 1", kind: InputKind::Composite(1) },
    VideoInput { name: "Composite 2", kind: InputKind::Composite(2) },
    VideoInput { name: "Composite 3", kind: InputKind::Composite(3) },
];

/// Board variant, which decides the input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    /// Composite + S-Video
    #[default]
    Dual,
    /// Four composite inputs
    Quad,
}

impl DeviceModel {
    /// Pick the model from a USB product id. Unknown ids get the dual table.
    pub fn from_product_id(product_id: u16) -> Self {
        match product_id {
            usb::PRODUCT_QUAD_A | usb::PRODUCT_QUAD_B => DeviceModel::Quad,
            _ => DeviceModel::Dual,
        }
    }

    pub fn inputs(self) -> &'static [VideoInput] {
        match self {
            DeviceModel::Dual => DUAL_INPUTS,
            DeviceModel::Quad => QUAD_INPUTS,
        }
    }

    pub fn input(self, index: usize) -> Option<&'static VideoInput> {
        self.inputs().get(index)
    }
}
