use super::iter_or_file;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::operators::mappers::{Haversine, Project};
use crate::operators::reducers::Mean;
use crate::operators::{InnerJoiner, UserMap};
use crate::sources::LineParser;
use crate::value::{Row, Value};
use chrono::{Datelike, NaiveDateTime, Timelike};

/// The reference timestamp format: `20171020T112238.723000`.
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.f";

/// Average speed in km/h by `(weekday, hour)` of the trip's start time.
///
/// Output: `(weekday, hour, speed)`.
#[allow(clippy::too_many_arguments)]
pub fn yandex_maps_graph(
    input_stream_name_time: impl Into<String>,
    input_stream_name_length: impl Into<String>,
    enter_time_column: &str,
    leave_time_column: &str,
    edge_id_column: &str,
    start_coord_column: &str,
    end_coord_column: &str,
    weekday_result_column: &str,
    hour_result_column: &str,
    speed_result_column: &str,
    filemod: bool,
    parser: LineParser,
) -> Graph {
    let enter_time_column = enter_time_column.to_string();
    let leave_time_column = leave_time_column.to_string();
    let edge_id_column = edge_id_column.to_string();
    let weekday_result_column = weekday_result_column.to_string();
    let hour_result_column = hour_result_column.to_string();
    let speed_result_column = speed_result_column.to_string();
    let delta_time_column = "delta".to_string();
    let road_length_column = "length".to_string();

    let time_delta = {
        let enter_time_column = enter_time_column.clone();
        let leave_time_column = leave_time_column.clone();
        let weekday_result_column = weekday_result_column.clone();
        let hour_result_column = hour_result_column.clone();
        let delta_time_column = delta_time_column.clone();
        move |row: Row| -> Result<Vec<Row>> {
            let start = parse_timestamp(&row, &enter_time_column)?;
            let end = parse_timestamp(&row, &leave_time_column)?;
            let delta_hours = (end - start).num_milliseconds() as f64 / 1000.0 / 3600.0;
            let mut row = row;
            row.insert(weekday_result_column.clone(), Value::str(start.weekday().to_string()));
            row.insert(hour_result_column.clone(), Value::int(start.hour() as i64));
            row.insert(delta_time_column.clone(), Value::float(delta_hours));
            Ok(vec![row])
        }
    };

    let time_input = iter_or_file(filemod, input_stream_name_time, parser.clone())
        .map(UserMap(time_delta))
        .sort(vec![edge_id_column.clone()]);

    let length_input = iter_or_file(filemod, input_stream_name_length, parser)
        .map(Haversine::new(start_coord_column, end_coord_column, road_length_column.as_str()))
        .sort(vec![edge_id_column.clone()]);

    let mean_speed = {
        let road_length_column = road_length_column.clone();
        let delta_time_column = delta_time_column.clone();
        let speed_result_column = speed_result_column.clone();
        move |row: Row| -> Result<Vec<Row>> {
            let dist = field_f64(&row, &road_length_column)?;
            let time = field_f64(&row, &delta_time_column)?;
            let mut row = row;
            row.insert(speed_result_column.clone(), Value::float(dist / time));
            Ok(vec![row])
        }
    };

    time_input
        .join(length_input, InnerJoiner, vec![edge_id_column])
        .map(UserMap(mean_speed))
        .map(Project::new([
            weekday_result_column.clone(),
            hour_result_column.clone(),
            speed_result_column.clone(),
        ]))
        .sort(vec![weekday_result_column.clone(), hour_result_column.clone()])
        .reduce(
            Mean::new(speed_result_column.as_str(), speed_result_column.as_str()),
            vec![weekday_result_column, hour_result_column],
        )
}

fn parse_timestamp(row: &Row, field: &str) -> Result<NaiveDateTime> {
    let text = row
        .get(field)
        .ok_or_else(|| Error::MissingField(field.to_string()))?
        .as_str()
        .ok_or_else(|| Error::TypeMismatch {
            field: field.to_string(),
            message: "expected a timestamp string".into(),
        })?;
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map_err(|e| Error::TypeMismatch {
        field: field.to_string(),
        message: format!("invalid timestamp {text:?}: {e}"),
    })
}

fn field_f64(row: &Row, field: &str) -> Result<f64> {
    row.get(field)
        .ok_or_else(|| Error::MissingField(field.to_string()))?
        .as_f64()
        .ok_or_else(|| Error::TypeMismatch {
            field: field.to_string(),
            message: "expected a numeric field".into(),
        })
}
