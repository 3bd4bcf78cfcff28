//! Classifier seam between the feature pipeline and the trained model

/// A trained binary classifier over fixed-width feature vectors.
///
/// Implementations are read-only after construction and may be shared
/// across threads without locking.
pub trait Classifier: Send + Sync {
    /// Width of the feature vectors this classifier expects
    fn feature_count(&self) -> usize;

    /// Probability of the positive class, in `[0, 1]`
    fn predict_proba(&self, features: &[f64]) -> f64;

    /// Predicted class bit (1 when the positive probability is at least 0.5)
    fn predict(&self, features: &[f64]) -> u8 {
        u8::from(self.predict_proba(features) >= 0.5)
    }
}
