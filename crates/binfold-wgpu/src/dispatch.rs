//! Workgroup coverage math.

/// Number of workgroups needed to cover `len` elements, rounding up so no
/// element is missed. The shader's bounds check discards the padding
/// invocations of the final group.
pub fn workgroup_count(len: u32, workgroup_size: u32) -> u32 {
    assert!(workgroup_size > 0, "workgroup_size must be > 0");
    len.div_ceil(workgroup_size)
}

/// Workgroup grid covering an `m` × `n` output with square tiles of
/// `tile` threads per side. X covers columns, Y covers rows.
pub fn matrix_workgroups(m: u32, n: u32, tile: u32) -> [u32; 3] {
    assert!(tile > 0, "tile must be > 0");
    [n.div_ceil(tile), m.div_ceil(tile), 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiple_needs_no_padding() {
        assert_eq!(workgroup_count(64, 64), 1);
        assert_eq!(workgroup_count(128, 64), 2);
        assert_eq!(workgroup_count(4096, 64), 64);
    }

    #[test]
    fn remainder_rounds_up() {
        assert_eq!(workgroup_count(1, 64), 1);
        assert_eq!(workgroup_count(63, 64), 1);
        assert_eq!(workgroup_count(65, 64), 2);
        assert_eq!(workgroup_count(129, 64), 3);
    }

    #[test]
    fn empty_input_needs_no_groups() {
        assert_eq!(workgroup_count(0, 64), 0);
    }

    #[test]
    fn other_group_sizes() {
        assert_eq!(workgroup_count(1000, 32), 32);
        assert_eq!(workgroup_count(1000, 256), 4);
        assert_eq!(workgroup_count(1, 1), 1);
    }

    #[test]
    #[should_panic(expected = "workgroup_size must be > 0")]
    fn zero_workgroup_size_panics() {
        workgroup_count(100, 0);
    }

    #[test]
    fn matrix_grid_exact() {
        assert_eq!(matrix_workgroups(16, 16, 16), [1, 1, 1]);
        assert_eq!(matrix_workgroups(32, 64, 16), [4, 2, 1]);
    }

    #[test]
    fn matrix_grid_remainder() {
        assert_eq!(matrix_workgroups(1, 128, 16), [8, 1, 1]);
        assert_eq!(matrix_workgroups(17, 33, 16), [3, 2, 1]);
    }
}
