//! Агрегация снимков метрик: последний снимок и средние за скользящее окно.

use chrono::{DateTime, Duration, Utc};

/// Окно усреднения для панели метрик.
pub const AVERAGE_WINDOW_HOURS: i64 = 12;

/// Снимок метрик с точки зрения агрегации.
pub trait Sample {
    fn collected_at(&self) -> DateTime<Utc>;
    fn cpu_percent(&self) -> f64;
    fn memory_percent(&self) -> f64;
}

/// Средние CPU и памяти. `None`, если в окне нет ни одного снимка.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RollingAverages {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
}

/// Средние арифметические по снимкам, собранным за `window` до `now`.
pub fn rolling_averages<S: Sample>(
    samples: &[S],
    now: DateTime<Utc>,
    window: Duration,
) -> RollingAverages {
    let cutoff = now - window;
    let (count, cpu, memory) = samples
        .iter()
        .filter(|s| s.collected_at() >= cutoff && s.collected_at() <= now)
        .fold((0usize, 0.0, 0.0), |(n, cpu, mem), s| {
            (n + 1, cpu + s.cpu_percent(), mem + s.memory_percent())
        });

    if count == 0 {
        return RollingAverages::default();
    }

    RollingAverages {
        cpu: Some(round1(cpu / count as f64)),
        memory: Some(round1(memory / count as f64)),
    }
}

/// Самый свежий снимок.
pub fn latest<S: Sample>(samples: &[S]) -> Option<&S> {
    samples.iter().max_by_key(|s| s.collected_at())
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Snap {
        at: DateTime<Utc>,
        cpu: f64,
        mem: f64,
    }

    impl Sample for Snap {
        fn collected_at(&self) -> DateTime<Utc> {
            self.at
        }
        fn cpu_percent(&self) -> f64 {
            self.cpu
        }
        fn memory_percent(&self) -> f64 {
            self.mem
        }
    }

    fn window() -> Duration {
        Duration::hours(AVERAGE_WINDOW_HOURS)
    }

    #[test]
    fn test_no_samples_in_window_gives_absent_averages() {
        let now = Utc::now();
        let old = [Snap {
            at: now - Duration::hours(13),
            cpu: 50.0,
            mem: 50.0,
        }];
        let avg = rolling_averages(&old, now, window());
        assert_eq!(avg.cpu, None);
        assert_eq!(avg.memory, None);

        let none: [Snap; 0] = [];
        assert_eq!(rolling_averages(&none, now, window()), RollingAverages::default());
    }

    #[test]
    fn test_zero_load_is_present_not_absent() {
        let now = Utc::now();
        let idle = [Snap {
            at: now - Duration::minutes(1),
            cpu: 0.0,
            mem: 0.0,
        }];
        let avg = rolling_averages(&idle, now, window());
        assert_eq!(avg.cpu, Some(0.0));
        assert_eq!(avg.memory, Some(0.0));
    }

    #[test]
    fn test_mean_over_window_only() {
        let now = Utc::now();
        let samples = [
            Snap {
                at: now - Duration::hours(1),
                cpu: 10.0,
                mem: 40.0,
            },
            Snap {
                at: now - Duration::hours(2),
                cpu: 20.0,
                mem: 60.0,
            },
            Snap {
                at: now - Duration::hours(20),
                cpu: 90.0,
                mem: 90.0,
            },
        ];
        let avg = rolling_averages(&samples, now, window());
        assert_eq!(avg.cpu, Some(15.0));
        assert_eq!(avg.memory, Some(50.0));
        assert_eq!(latest(&samples).map(|s| s.cpu), Some(10.0));
    }
}
