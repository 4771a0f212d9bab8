use blocktile::{ArrayConfig, Point};

#[test_log::test]
fn nonzero_reports_scattered_elements_in_ascending_block_order() -> blocktile::Result<()> {
    let mut array = ArrayConfig::<3>::new(Point([20, 30, 40]))
        .manage_coordinate_lists(true)
        .build::<u32>();

    array.write_point(Point([3, 4, 5]), 2)?;
    array.write_point(Point([80, 99, 260]), 3)?;

    let (positions, values) = array.nonzero();
    assert_eq!(positions, vec![Point([3, 4, 5]), Point([80, 99, 260])]);
    assert_eq!(values, vec![2, 3]);
    Ok(())
}
