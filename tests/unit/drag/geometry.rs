use super::*;

#[test]
fn thirty_forty_thirty_split() {
    // Target spans [100, 200).
    assert_eq!(drop_position(100.0, 100.0, 100.0, false).unwrap(), DropPosition::Before);
    assert_eq!(drop_position(129.0, 100.0, 100.0, false).unwrap(), DropPosition::Before);
    assert_eq!(drop_position(149.0, 100.0, 100.0, false).unwrap(), DropPosition::Before);
    assert_eq!(drop_position(150.0, 100.0, 100.0, false).unwrap(), DropPosition::After);
    assert_eq!(drop_position(171.0, 100.0, 100.0, false).unwrap(), DropPosition::After);
    assert_eq!(drop_position(250.0, 100.0, 100.0, false).unwrap(), DropPosition::After);
    assert_eq!(drop_position(50.0, 100.0, 100.0, false).unwrap(), DropPosition::Before);
}

#[test]
fn containers_take_the_middle_band() {
    assert_eq!(drop_position(110.0, 100.0, 100.0, true).unwrap(), DropPosition::Before);
    assert_eq!(drop_position(140.0, 100.0, 100.0, true).unwrap(), DropPosition::Inside);
    assert_eq!(drop_position(160.0, 100.0, 100.0, true).unwrap(), DropPosition::Inside);
    assert_eq!(drop_position(190.0, 100.0, 100.0, true).unwrap(), DropPosition::After);
}

#[test]
fn bad_geometry_is_a_drag_error() {
    for (y, top, h) in [
        (f64::NAN, 0.0, 10.0),
        (0.0, f64::INFINITY, 10.0),
        (0.0, 0.0, 0.0),
        (0.0, 0.0, -5.0),
    ] {
        let err = drop_position(y, top, h, false).unwrap_err();
        assert!(err.to_string().starts_with("drag error:"), "{err}");
    }
    assert!(drop_position_in_band(5.0, 0.0, 10.0, false, 0.7).is_err());
}

#[test]
fn custom_band_moves_the_edges() {
    assert_eq!(
        drop_position_in_band(15.0, 0.0, 100.0, false, 0.1).unwrap(),
        DropPosition::Before
    );
    assert_eq!(
        drop_position_in_band(15.0, 0.0, 100.0, true, 0.1).unwrap(),
        DropPosition::Inside
    );
}

#[test]
fn insertion_index_for_new_items() {
    assert_eq!(insertion_index(1, DropPosition::Before, None), 1);
    assert_eq!(insertion_index(1, DropPosition::After, None), 2);
}

#[test]
fn insertion_index_compensates_for_removed_source() {
    // [A, B, C]: C onto A before stays at 0; A onto C after lands at 2.
    assert_eq!(insertion_index(0, DropPosition::Before, Some(2)), 0);
    assert_eq!(insertion_index(2, DropPosition::After, Some(0)), 2);
    assert_eq!(insertion_index(1, DropPosition::Before, Some(1)), 1);
}

#[test]
fn reorder_matches_drag_examples() {
    let list = vec!['A', 'B', 'C'];
    let to = insertion_index(0, DropPosition::Before, Some(2));
    assert_eq!(reorder(&list, 2, to), vec!['C', 'A', 'B']);
    let to = insertion_index(2, DropPosition::After, Some(0));
    assert_eq!(reorder(&list, 0, to), vec!['B', 'C', 'A']);
}

#[test]
fn reorder_out_of_range_is_identity() {
    let list = vec![1, 2, 3];
    assert_eq!(reorder(&list, 7, 0), list);
    assert_eq!(reorder(&list, 0, 99), vec![2, 3, 1]);
}
