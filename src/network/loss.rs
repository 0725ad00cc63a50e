use std::fmt::Display;
use std::str::FromStr;

use ndarray::Array2;

use super::NetworkError;

pub fn mse(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> Option<f64> {
    (y_true - y_pred).map(|v| v.powf(2.0)).mean()
}

pub fn mse_prime(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> Array2<f64> {
    2.0 * (y_pred - y_true) / (y_true.len() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    Mse,
}

impl Loss {
    pub fn loss(&self, y_true: &Array2<f64>, y_pred: &Array2<f64>) -> f64 {
        match self {
            Self::Mse => mse(y_true, y_pred).unwrap_or(0.0),
        }
    }

    pub fn derivative(&self, y_true: &Array2<f64>, y_pred: &Array2<f64>) -> Array2<f64> {
        match self {
            Self::Mse => mse_prime(y_true, y_pred),
        }
    }
}

impl FromStr for Loss {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mse" | "mean_squared_error" => Ok(Self::Mse),
            other => Err(NetworkError::UnknownLoss(other.to_string())),
        }
    }
}

impl Display for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mse => write!(f, "mse"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn mse_averages_over_every_entry() {
        let y_true = arr2(&[[1.0, 0.0], [0.0, 0.0]]);
        let y_pred = arr2(&[[0.0, 0.0], [0.0, 2.0]]);
        assert_eq!(Loss::Mse.loss(&y_true, &y_pred), 1.25);
        assert_eq!(
            Loss::Mse.derivative(&y_true, &y_pred),
            arr2(&[[-0.5, 0.0], [0.0, 1.0]])
        );
    }

    #[test]
    fn parses_loss_names() {
        assert_eq!("mse".parse::<Loss>().unwrap(), Loss::Mse);
        assert_eq!("Mean_Squared_Error".parse::<Loss>().unwrap(), Loss::Mse);
        assert!(matches!(
            "hinge".parse::<Loss>().unwrap_err(),
            NetworkError::UnknownLoss(name) if name == "hinge"
        ));
    }
}
