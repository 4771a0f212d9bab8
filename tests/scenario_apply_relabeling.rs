use blocktile::{Array, Point};

#[test_log::test]
fn apply_relabeling_maps_every_written_element_through_the_table() -> blocktile::Result<()> {
    let mut array = Array::<3, u32>::new(Point([20, 30, 40]));
    array.write_point(Point([3, 4, 5]), 2)?;
    array.write_point(Point([80, 99, 260]), 3)?;

    array.apply_relabeling(&[0, 0, 42, 99, 0])?;

    assert_eq!(array.read_point(Point([3, 4, 5]))?, 42);
    assert_eq!(array.read_point(Point([80, 99, 260]))?, 99);
    assert_eq!(array.read_point(Point([0, 0, 0]))?, 0);
    Ok(())
}
