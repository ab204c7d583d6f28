// Record printing: human-readable blocks or one JSON object per line

use crate::config::OutputFormat;
use anyhow::Result;
use chrono::NaiveTime;
use colored::*;
use sensorlink_core::ObservationEvent;

/// Capture time as `HH:MM:SS.nnnnnnnnn`, if the fields describe a valid time of day.
pub fn time_of_day(seconds_since_midnight: u64, nanoseconds: u64) -> Option<String> {
    let secs = u32::try_from(seconds_since_midnight).ok()?;
    let nanos = u32::try_from(nanoseconds).ok()?;
    if nanos >= 1_000_000_000 {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        .map(|t| t.format("%H:%M:%S%.9f").to_string())
}

/// Decimal bytes in brackets, space separated: `[141 64 98]`.
fn byte_list(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
    format!("[{}]", items.join(" "))
}

pub fn render_text(event: &ObservationEvent) -> String {
    let obs = &event.observation;
    let mut out = String::new();

    if event.location_overridden {
        out.push_str(&format!(
            "{}\n",
            format!("*** Applied location override for peer {} ***", event.peer_id).yellow()
        ));
    }
    out.push_str(&format!(
        "{}\n",
        format!("=== ModeS Message from Peer {} ===", event.peer_id).bold()
    ));
    out.push_str(&format!("Sensor ID: {}\n", obs.sensor_id));
    out.push_str(&format!(
        "Sensor Position: Lat={:.6}, Lon={:.6}, Alt={:.2}\n",
        obs.latitude, obs.longitude, obs.altitude
    ));
    let clock = time_of_day(obs.seconds_since_midnight, obs.nanoseconds)
        .unwrap_or_else(|| "invalid".to_string());
    out.push_str(&format!(
        "Timestamp: SecondsSinceMidnight={}, Nanoseconds={} ({})\n",
        obs.seconds_since_midnight, obs.nanoseconds, clock
    ));
    out.push_str(&format!(
        "Raw ModeS (hex): {}\n",
        hex::encode(&obs.raw_payload).bright_cyan()
    ));
    out.push_str(&format!("Raw ModeS (bytes): {}\n", byte_list(&obs.raw_payload)));
    out.push_str(&format!("Raw ModeS length: {} bytes\n", obs.raw_payload.len()));
    out.push_str("---");
    out
}

pub fn render_json(event: &ObservationEvent) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

pub fn print_event(format: OutputFormat, event: &ObservationEvent) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", render_text(event)),
        OutputFormat::Json => println!("{}", render_json(event)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libp2p::PeerId;
    use sensorlink_core::SensorObservation;

    fn event(overridden: bool) -> ObservationEvent {
        ObservationEvent {
            peer_id: PeerId::random(),
            observation: SensorObservation {
                sensor_id: 42,
                latitude: 50.102509,
                longitude: -5.68199,
                altitude: 192.8,
                seconds_since_midnight: 45_296,
                nanoseconds: 5,
                raw_payload: vec![0x8D, 0x40],
            },
            location_overridden: overridden,
        }
    }

    #[test]
    fn test_time_of_day() {
        assert_eq!(
            time_of_day(45_296, 123_000_000),
            Some("12:34:56.123000000".to_string())
        );
        assert_eq!(time_of_day(0, 0), Some("00:00:00.000000000".to_string()));
        assert_eq!(time_of_day(86_400, 0), None);
        assert_eq!(time_of_day(10, 1_000_000_000), None);
    }

    #[test]
    fn test_text_block() {
        colored::control::set_override(false);
        let text = render_text(&event(true));

        assert!(text.contains("*** Applied location override for peer"));
        assert!(text.contains("Sensor ID: 42"));
        assert!(text.contains("Lat=50.102509, Lon=-5.681990, Alt=192.80"));
        assert!(text.contains("Raw ModeS (hex): 8d40"));
        assert!(text.contains("Raw ModeS (bytes): [141 64]\n"));
        assert!(text.contains("Raw ModeS length: 2 bytes"));
        assert!(text.ends_with("---"));

        assert!(!render_text(&event(false)).contains("Applied location override"));
    }

    #[test]
    fn test_byte_list() {
        assert_eq!(byte_list(&[]), "[]");
        assert_eq!(byte_list(&[0, 255, 7]), "[0 255 7]");
    }

    #[test]
    fn test_json_line() {
        let line = render_json(&event(false)).unwrap();
        assert!(!line.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["observation"]["sensor_id"], 42);
        assert_eq!(value["observation"]["raw_payload"], "8d40");
        assert_eq!(value["location_overridden"], false);
    }
}
