use arm_fs::{PackageFile, compute_package_checksum, is_valid_checksum};
use proptest::prelude::*;

/// Distinct paths mapped to arbitrary content.
fn files_strategy(max: usize) -> impl Strategy<Value = Vec<PackageFile>> {
    proptest::collection::btree_map(
        "[a-z]{1,8}(/[a-z]{1,8}){0,2}\\.yml",
        proptest::collection::vec(any::<u8>(), 0..64),
        0..max,
    )
    .prop_map(|map| {
        map.into_iter()
            .map(|(path, content)| PackageFile::new(path.as_str(), content))
            .collect()
    })
}

proptest! {
    #[test]
    fn checksum_is_order_independent(mut files in files_strategy(8)) {
        let original = compute_package_checksum(&files);
        files.reverse();
        prop_assert_eq!(original, compute_package_checksum(&files));
    }

    #[test]
    fn checksum_is_well_formed(files in files_strategy(4)) {
        prop_assert!(is_valid_checksum(&compute_package_checksum(&files)));
    }
}
