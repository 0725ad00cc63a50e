use ndarray::ArrayD;

pub fn relu(x: &ArrayD<f64>) -> ArrayD<f64> {
    x.map(|v| v.max(0.0))
}

pub fn relu_prime(x: &ArrayD<f64>) -> ArrayD<f64> {
    x.map(|v| if *v > 0.0 { 1.0 } else { 0.0 })
}
