use approx::assert_abs_diff_eq;
use ndarray::{arr1, arr2, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::linear_layer::LinearLayer;

// Helper to create a standard test layer
fn create_f32_layer() -> LinearLayer {
    // Weights: 2x2 matrix
    // [[1.0, 2.0],
    //  [3.0, 4.0]]
    let weights = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
    LinearLayer::new_f32(weights, None)
}

#[test]
fn test_matmul_f32_basic() {
    let layer = create_f32_layer();
    let input = arr2(&[[1.0, 1.0]]);

    // Expected: Input @ Weights^T
    // [1*1 + 1*2, 1*3 + 1*4] = [3.0, 7.0]
    let output = layer.matmul(&input.view());

    assert_eq!(output, arr2(&[[3.0, 7.0]]));
}

#[test]
fn test_matmul_f32_with_bias() {
    let weights = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
    let bias = arr1(&[10.0, 20.0]);
    let layer = LinearLayer::new_f32(weights, Some(bias));

    let input = arr2(&[[1.0, 1.0]]);
    let output = layer.matmul(&input.view());

    assert_eq!(output, arr2(&[[13.0, 27.0]]));
}

#[test]
fn test_matmul_f32_batch() {
    let layer = create_f32_layer();
    let input = arr2(&[[1.0, 0.0], [0.0, 1.0]]);

    let output = layer.matmul(&input.view());

    // Row 0: [1*1 + 0*2, 1*3 + 0*4] = [1.0, 3.0]
    // Row 1: [0*1 + 1*2, 0*3 + 1*4] = [2.0, 4.0]
    assert_eq!(output, arr2(&[[1.0, 3.0], [2.0, 4.0]]));
}

#[test]
fn test_non_square_shapes() {
    // 3 outputs, 2 inputs
    let layer = LinearLayer::new_f32(arr2(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]), None);
    assert_eq!(layer.shape(), [3, 2]);
    assert_eq!(layer.in_features(), 2);
    assert_eq!(layer.out_features(), 3);

    let output = layer.matmul(&arr2(&[[2.0, 5.0]]).view());
    assert_eq!(output, arr2(&[[2.0, 5.0, 7.0]]));
}

#[test]
fn test_try_matmul_rejects_wrong_width() {
    let layer = create_f32_layer();
    let input = Array2::<f32>::zeros((1, 3));
    let err = layer.try_matmul(&input.view()).unwrap_err();
    assert!(err.to_string().contains("expects 2 input features, got 3"));
}

#[test]
fn test_try_new_rejects_bad_bias() {
    let result = LinearLayer::try_new_f32(arr2(&[[1.0, 2.0]]), Some(arr1(&[1.0, 2.0])));
    assert!(result.is_err());
}

#[test]
fn test_random_is_seeded() {
    let a = LinearLayer::random(4, 8, 0.02, true, &mut StdRng::seed_from_u64(7)).unwrap();
    let b = LinearLayer::random(4, 8, 0.02, true, &mut StdRng::seed_from_u64(7)).unwrap();
    assert_eq!(a.weight(), b.weight());
    assert!(a.has_bias());
    assert_abs_diff_eq!(a.bias().unwrap().sum(), 0.0);
}

#[test]
fn test_random_rejects_negative_std() {
    let result = LinearLayer::random(4, 8, -0.02, false, &mut StdRng::seed_from_u64(7));
    assert!(result.is_err());
}
