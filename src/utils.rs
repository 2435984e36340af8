use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// Sums a list of floats with Neumaier compensation, so that long lists of
/// rule probabilities add up to what they should instead of drifting.
///
/// ```
/// let v = vec![0.1; 10];
///
/// assert_eq!(v.iter().sum::<f64>(), 0.9999999999999999);
/// assert_eq!(cykparse::utils::fsum(v), 1.0);
/// ```
pub fn fsum<I>(values: I) -> f64
where
  I: IntoIterator<Item = f64>,
{
  let mut sum = 0.0;
  let mut compensation = 0.0;
  for v in values {
    let t = sum + v;
    if f64::abs(sum) >= f64::abs(v) {
      compensation += (sum - t) + v;
    } else {
      compensation += (v - t) + sum;
    }
    sum = t;
  }
  sum + compensation
}

/// Whether two floats are within `tolerance` of each other
pub fn is_close(a: f64, b: f64, tolerance: f64) -> bool {
  (a - b).abs() <= tolerance
}
