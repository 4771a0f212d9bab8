use blocktile::{ArrayConfig, DenseArray, Point};

#[test_log::test]
fn min_max_tracks_writes_and_reverts_after_zeroing() -> blocktile::Result<()> {
    let mut array = ArrayConfig::<3>::new(Point([10, 10, 10])).min_max_tracking(true).build::<u8>();
    assert_eq!(array.min_max(), (0, 0));

    let ones_shape = Point([3, 3, 2]);
    let mut ones = DenseArray::<3, u8>::zeros(ones_shape);
    for p in blocktile::view::iter_points(ones_shape) {
        ones.set(p, 1);
    }
    array.write_region(Point([0, 0, 0]), Point([3, 3, 2]), ones.view())?;
    assert_eq!(array.min_max(), (0, 1));

    let zeros = DenseArray::<3, u8>::zeros(ones_shape);
    array.write_region(Point([0, 0, 0]), Point([3, 3, 2]), zeros.view())?;
    assert_eq!(array.min_max(), (0, 0));
    Ok(())
}
