//! Access-mask rendering
//!
//! Maps a raw Win32 access mask to the conventional named file-system
//! rights. Composite rights are recognized first so a full-control ACE
//! renders as `FullControl` rather than fourteen individual bits.

/// Composite rights, checked in order from widest to narrowest
const COMPOSITE_RIGHTS: &[(u32, &str)] = &[
    (0x001F_01FF, "FullControl"),
    (0x0003_01BF, "Modify"),
    (0x0002_00A9, "ReadAndExecute"),
    (0x0002_0089, "Read"),
    (0x0000_0116, "Write"),
];

/// Individual rights bits
const SINGLE_RIGHTS: &[(u32, &str)] = &[
    (0x0000_0001, "ReadData"),
    (0x0000_0002, "WriteData"),
    (0x0000_0004, "AppendData"),
    (0x0000_0008, "ReadExtendedAttributes"),
    (0x0000_0010, "WriteExtendedAttributes"),
    (0x0000_0020, "ExecuteFile"),
    (0x0000_0040, "DeleteSubdirectoriesAndFiles"),
    (0x0000_0080, "ReadAttributes"),
    (0x0000_0100, "WriteAttributes"),
    (0x0001_0000, "Delete"),
    (0x0002_0000, "ReadPermissions"),
    (0x0004_0000, "ChangePermissions"),
    (0x0008_0000, "TakeOwnership"),
    (0x0010_0000, "Synchronize"),
    (0x1000_0000, "GenericAll"),
    (0x2000_0000, "GenericExecute"),
    (0x4000_0000, "GenericWrite"),
    (0x8000_0000, "GenericRead"),
];

/// Render an access mask as a comma-joined set of right names
///
/// Bits not covered by any known right are appended as a hex remainder so
/// no granted access is silently dropped from the rendering.
pub fn rights_names(mask: u32) -> String {
    if mask == 0 {
        return "None".to_string();
    }

    let mut names = Vec::new();
    let mut remaining = mask;

    for &(bits, name) in COMPOSITE_RIGHTS {
        if remaining & bits == bits {
            names.push(name.to_string());
            remaining &= !bits;
        }
    }

    for &(bit, name) in SINGLE_RIGHTS {
        if remaining & bit == bit {
            names.push(name.to_string());
            remaining &= !bit;
        }
    }

    if remaining != 0 {
        names.push(format!("0x{:X}", remaining));
    }

    names.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_control() {
        assert_eq!(rights_names(0x001F_01FF), "FullControl");
    }

    #[test]
    fn test_modify_collapses() {
        assert_eq!(rights_names(0x0003_01BF), "Modify");
    }

    #[test]
    fn test_read_and_execute() {
        assert_eq!(rights_names(0x0002_00A9), "ReadAndExecute");
    }

    #[test]
    fn test_composite_preferred_over_singles() {
        // Read plus Delete: the composite is named, the extra bit separately
        let rendered = rights_names(0x0002_0089 | 0x0001_0000);
        assert_eq!(rendered, "Read,Delete");
    }

    #[test]
    fn test_single_bits() {
        assert_eq!(rights_names(0x0001_0000), "Delete");
        assert_eq!(rights_names(0x0008_0000), "TakeOwnership");
    }

    #[test]
    fn test_zero_mask() {
        assert_eq!(rights_names(0), "None");
    }

    #[test]
    fn test_unknown_bits_kept_as_hex() {
        let rendered = rights_names(0x0100_0000);
        assert_eq!(rendered, "0x1000000");
    }
}
