use crate::models::AnomalyLevel;

pub fn classify_status(
    today_count: u64,
    today_threshold: Option<f64>,
    attention_factor: f64,
) -> AnomalyLevel {
    let Some(threshold) = today_threshold else {
        return AnomalyLevel::NoData;
    };
    let count = today_count as f64;

    if count <= threshold {
        AnomalyLevel::Healthy
    } else if count <= threshold * attention_factor {
        AnomalyLevel::Caution
    } else {
        AnomalyLevel::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_threshold_means_no_data() {
        assert_eq!(classify_status(12, None, 1.2), AnomalyLevel::NoData);
    }

    #[test]
    fn partitions_against_both_bounds() {
        assert_eq!(classify_status(10, Some(10.0), 1.2), AnomalyLevel::Healthy);
        assert_eq!(classify_status(11, Some(10.0), 1.2), AnomalyLevel::Caution);
        assert_eq!(classify_status(12, Some(10.0), 1.2), AnomalyLevel::Caution);
        assert_eq!(classify_status(13, Some(10.0), 1.2), AnomalyLevel::Warning);
    }

    #[test]
    fn levels_agree_with_bounds_for_every_count() {
        for &(threshold, attention) in &[(0.0, 1.2), (2.5, 1.25), (7.3, 1.3), (15.0, 1.5)] {
            for count in 0..40u64 {
                let value = count as f64;
                match classify_status(count, Some(threshold), attention) {
                    AnomalyLevel::Healthy => assert!(value <= threshold),
                    AnomalyLevel::Caution => {
                        assert!(value > threshold && value <= threshold * attention)
                    }
                    AnomalyLevel::Warning => assert!(value > threshold * attention),
                    AnomalyLevel::NoData => panic!("threshold was present"),
                }
            }
        }
    }
}
