//! Timing reference code carried after each `ff 00 00` preamble

use serde::{Deserialize, Serialize};

use super::wire::trc;

/// Timing reference code (the BT.656 "XY" status byte).
///
/// Three bits carry meaning for frame assembly: H (end vs start of active
/// video), V (vertical blanking) and F (field two). The remaining bits are
/// protection bits and are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trc(pub u8);

impl Trc {
    /// Wrap a raw status byte.
    pub fn new(value: u8) -> Self {
        Self(value)
    }

    /// Build a code from its three meaningful flags.
    pub fn from_flags(end_of_active: bool, blanking: bool, field_two: bool) -> Self {
        let mut value = trc::MARKER;
        if end_of_active {
            value |= trc::EAV;
        }
        if blanking {
            value |= trc::VBI;
        }
        if field_two {
            value |= trc::FIELD_2;
        }
        Self(value)
    }

    /// Start of active video (SAV) rather than end (EAV).
    pub fn is_start_marker(self) -> bool {
        self.0 & trc::EAV == 0
    }

    /// Active picture lines rather than vertical blanking.
    pub fn is_active_video(self) -> bool {
        self.0 & trc::VBI == 0
    }

    pub fn is_field_two(self) -> bool {
        self.0 & trc::FIELD_2 != 0
    }

    /// SAV for an active line of the first field, the only code that may
    /// open a new frame.
    pub fn opens_frame(self) -> bool {
        self.is_start_marker() && self.is_active_video() && !self.is_field_two()
    }

    /// Get the raw byte.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for Trc {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Trc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}/{}",
            if self.is_start_marker() { "SAV" } else { "EAV" },
            if self.is_active_video() { "" } else { "(VBI)" },
            if self.is_field_two() { "F2" } else { "F1" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn saa7113_codes_decode() {
        // SAV/EAV for active lines and blanking in both fields.
        let sav_f1 = Trc(0x80);
        assert!(sav_f1.is_start_marker() && sav_f1.is_active_video() && !sav_f1.is_field_two());
        assert!(sav_f1.opens_frame());

        let eav_f1 = Trc(0x9d);
        assert!(!eav_f1.is_start_marker());
        assert!(eav_f1.is_active_video());

        let sav_vbi_f2 = Trc(0xec);
        assert!(sav_vbi_f2.is_start_marker());
        assert!(!sav_vbi_f2.is_active_video());
        assert!(sav_vbi_f2.is_field_two());
        assert!(!sav_vbi_f2.opens_frame());
    }

    #[test]
    fn display_names_the_transition() {
        assert_eq!(Trc::from_flags(false, false, false).to_string(), "SAV/F1");
        assert_eq!(Trc::from_flags(true, true, true).to_string(), "EAV(VBI)/F2");
    }

    proptest! {
        #[test]
        fn from_flags_round_trips_predicates(eav in any::<bool>(), vbi in any::<bool>(), f2 in any::<bool>()) {
            let code = Trc::from_flags(eav, vbi, f2);
            prop_assert_eq!(code.is_start_marker(), !eav);
            prop_assert_eq!(code.is_active_video(), !vbi);
            prop_assert_eq!(code.is_field_two(), f2);
        }

        #[test]
        fn reserved_bits_never_change_meaning(raw in any::<u8>(), protection in 0u8..16) {
            let base = Trc(raw & !trc::RESERVED_MASK);
            let noisy = Trc((raw & !trc::RESERVED_MASK) | protection);
            prop_assert_eq!(base.is_start_marker(), noisy.is_start_marker());
            prop_assert_eq!(base.is_active_video(), noisy.is_active_video());
            prop_assert_eq!(base.is_field_two(), noisy.is_field_two());
        }
    }
}
