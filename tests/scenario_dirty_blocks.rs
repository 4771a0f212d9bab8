use blocktile::{Array, DenseArray, Point};

#[test_log::test]
fn set_dirty_region_marks_exactly_the_touched_column_of_blocks() -> blocktile::Result<()> {
    let mut array = Array::<2, u8>::new(Point([10, 10]));

    let full_shape = Point([100, 100]);
    let mut ones = DenseArray::<2, u8>::zeros(full_shape);
    for p in blocktile::view::iter_points(full_shape) {
        ones.set(p, 1);
    }
    array.write_region(Point([0, 0]), Point([100, 100]), ones.view())?;
    assert_eq!(array.dirty_blocks(Point([0, 0]), Point([100, 100])).len(), 0);

    array.set_dirty_region(Point([50, 0]), Point([60, 100]), true);
    let dirty = array.dirty_blocks(Point([0, 0]), Point([100, 100]));
    assert_eq!(dirty.len(), 10);
    assert!(dirty.iter().all(|idx| idx[0] == 5));
    Ok(())
}
