//! Property tests for blob slicing.

use fsaccess::{Blob, BlobPart};
use proptest::prelude::*;

fn parts() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 0..8)
}

fn flatten(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.concat()
}

/// Blobs built from nested, possibly pre-sliced blobs, with their flat bytes.
fn nested() -> impl Strategy<Value = (Blob, Vec<u8>)> {
    let leaf = prop::collection::vec(any::<u8>(), 0..16).prop_map(|bytes| (Blob::from(bytes.clone()), bytes));
    leaf.prop_recursive(3, 48, 4, |inner| {
        let child = (inner, 0usize..24, 0usize..24).prop_map(|((blob, flat), a, b)| {
            let (start, end) = (a.min(flat.len()), b.min(flat.len()));
            let bytes = if start < end { flat[start..end].to_vec() } else { Vec::new() };
            (blob.slice(a as i64..b as i64), bytes)
        });
        prop::collection::vec(child, 0..4).prop_map(|children| {
            let flat: Vec<u8> = children.iter().flat_map(|(_, bytes)| bytes.iter().copied()).collect();
            let blob = Blob::new(children.into_iter().map(|(blob, _)| BlobPart::from(blob)));
            (blob, flat)
        })
    })
}

proptest! {
    #[test]
    fn slice_matches_flat_bytes(parts in parts(), a in 0usize..160, b in 0usize..160) {
        let blob = Blob::new(parts.clone());
        let flat = flatten(&parts);
        let (start, end) = (a.min(flat.len()), b.min(flat.len()));
        let expected = if start < end { flat[start..end].to_vec() } else { Vec::new() };

        prop_assert_eq!(blob.slice(a as i64..b as i64).array_buffer(), expected);
    }

    #[test]
    fn slices_compose(parts in parts(), cuts in prop::collection::vec(0usize..160, 3)) {
        let blob = Blob::new(parts);
        let len = blob.size() as usize;
        let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c.min(len)).collect();
        cuts.sort_unstable();
        let (i, j, k) = (cuts[0] as i64, cuts[1] as i64, cuts[2] as i64);

        let outer = blob.slice(i..k).slice(0..j - i);
        let direct = blob.slice(i..j);
        prop_assert_eq!(outer.size(), direct.size());
        prop_assert_eq!(outer.array_buffer(), direct.array_buffer());
    }

    #[test]
    fn negative_bounds_count_from_end(parts in parts(), back in 1i64..32) {
        let blob = Blob::new(parts);
        let size = blob.size() as i64;
        let tail = blob.slice(-back..);
        prop_assert_eq!(tail.size() as i64, back.min(size));
        prop_assert_eq!(tail.array_buffer(), blob.slice((size - back).max(0)..).array_buffer());
    }

    #[test]
    fn nested_slice_matches_flat_bytes((blob, flat) in nested(), a in 0usize..96, b in 0usize..96) {
        prop_assert_eq!(blob.size() as usize, flat.len());
        prop_assert_eq!(blob.array_buffer(), flat.clone());

        let (start, end) = (a.min(flat.len()), b.min(flat.len()));
        let expected = if start < end { flat[start..end].to_vec() } else { Vec::new() };
        prop_assert_eq!(blob.slice(a as i64..b as i64).array_buffer(), expected);
    }

    #[test]
    fn nested_slices_compose((blob, flat) in nested(), cuts in prop::collection::vec(0usize..96, 3)) {
        let len = flat.len();
        let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c.min(len)).collect();
        cuts.sort_unstable();
        let (i, j, k) = (cuts[0], cuts[1], cuts[2]);

        let outer = blob.slice(i as i64..k as i64).slice(0..(j - i) as i64);
        prop_assert_eq!(outer.size() as usize, j - i);
        prop_assert_eq!(outer.array_buffer(), flat[i..j].to_vec());
    }
}
