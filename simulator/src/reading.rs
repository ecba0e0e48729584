use rand::Rng;
use serde::Serialize;

/// Body posted to `/devices/{uuid}/readings/`.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    #[serde(rename = "type")]
    pub sensor_type: &'static str,
    pub value: i64,
    pub date_created: i64,
}

impl Reading {
    pub fn random(rng: &mut impl Rng, sensor_type: &'static str, date_created: i64) -> Self {
        let value = match sensor_type {
            "temperature" if rng.gen_bool(0.05) => rng.gen_range(-50..100), // 5% outliers
            "temperature" => rng.gen_range(15..35),
            _ if rng.gen_bool(0.05) => rng.gen_range(0..=100),
            _ => rng.gen_range(30..80),
        };

        Self {
            sensor_type,
            value,
            date_created,
        }
    }
}
