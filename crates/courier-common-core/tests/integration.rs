use courier_common_core::codec::{with_date_decoding, DateDecoding};
use courier_common_core::{Primitive, Timestamp, TimestampParser};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Dated {
    date: Timestamp,
}

fn decode(raw: &str) -> Result<Dated, serde_json::Error> {
    serde_json::from_str(&format!("{{\"date\":\"{raw}\"}}"))
}

#[test]
fn test_every_backend_shape_decodes() {
    for raw in [
        "2006-01-02T15:04:05Z0700",
        "2022-09-05T10:35:08Z",
        "2022-09-05T10:35:08.217174Z",
        "2006-01-02T15:04:05",
        "2022-09-05T10:35:08.217174",
        "2022-09-05",
        "2022-09-05T10:35:08+003",
    ] {
        assert!(decode(raw).is_ok(), "{raw} should decode");
    }
}

#[test]
fn test_current_time_round_trips() {
    let now = Timestamp::now();
    let json = serde_json::to_string(&Dated { date: now }).unwrap();
    let decoded: Dated = serde_json::from_str(&json).unwrap();
    let drift = now.as_datetime() - decoded.date.as_datetime();
    assert!(drift.num_microseconds().unwrap().abs() < 1);
}

#[test]
fn test_unknown_shape_is_a_field_error() {
    let err = decode("not-a-date").unwrap_err();
    assert!(err.is_data());
    assert!(err.to_string().contains("not-a-date"));
}

#[test]
fn test_reference_offset_flows_through_decoding() {
    let offset = courier_common_core::timestamp::parse_offset("+05:00").unwrap();
    let strategy = DateDecoding::Lenient(TimestampParser::with_reference_offset(offset));
    let decoded = with_date_decoding(strategy, || decode("2022-09-05T10:35:08")).unwrap();
    assert_eq!(decoded.date.to_string(), "2022-09-05T05:35:08.000000Z");
}

#[test]
fn test_primitive_payload() {
    #[derive(Deserialize)]
    struct Row {
        cells: Vec<Primitive>,
    }

    let row: Row =
        serde_json::from_str(r#"{"cells":[1,2.5,"x",false,"2022-09-05",null]}"#).unwrap();
    assert_eq!(row.cells[0], Primitive::Int(1));
    assert_eq!(row.cells[1], Primitive::Double(2.5));
    assert_eq!(row.cells[2], Primitive::String("x".into()));
    assert_eq!(row.cells[3], Primitive::Bool(false));
    assert!(row.cells[4].as_timestamp().is_some());
    assert!(row.cells[5].is_unknown());
}
