use blocktile::{Array, ArrayConfig, Point};

#[test_log::test]
fn save_then_load_preserves_data_and_caches() -> blocktile::Result<()> {
    let mut array = ArrayConfig::<3>::new(Point([10, 10, 10]))
        .min_max_tracking(true)
        .manage_coordinate_lists(true)
        .build::<u32>();

    array.write_point(Point([1, 2, 3]), 10)?;
    array.write_point(Point([15, 16, 17]), 20)?;

    let mut bytes = Vec::new();
    blocktile::persistence::save(&array, &mut bytes)?;

    let mut reloaded: Array<3, u32> = blocktile::persistence::load(&mut bytes.as_slice())?;

    assert_eq!(reloaded.num_blocks(), array.num_blocks());
    assert_eq!(reloaded.read_point(Point([1, 2, 3]))?, 10);
    assert_eq!(reloaded.read_point(Point([15, 16, 17]))?, 20);
    assert_eq!(reloaded.min_max(), array.min_max());
    assert_eq!(reloaded.nonzero(), array.nonzero());
    Ok(())
}

#[test_log::test]
fn load_rejects_truncated_stream() {
    let bytes = vec![b'B', b'T', b'A', b'R'];
    let result: blocktile::Result<Array<3, u32>> = blocktile::persistence::load(&mut bytes.as_slice());
    assert!(result.is_err());
}
