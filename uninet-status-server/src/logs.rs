/**
 * LOGS PAR CARRERA - Lecture du journal JSON-lines du labo
 *
 * ROLE :
 * The lab backend appends one JSON object per request to a log file
 * (`uid`, `carrera`, `ip`, `method`, `path`, `status`, `ts`...). This module reads
 * the tail of that file and answers three questions:
 * - which entries match a carrera and/or a uid
 * - which carreras appear in the log
 * - who was last seen on each PC address (roster sessions)
 *
 * FONCTIONNEMENT :
 * - only the last `limit` lines are looked at; blank lines count toward the limit
 * - non-JSON and non-object lines are skipped
 * - a missing file is an empty log, any other IO error is reported
 */

use crate::error::ServerError;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tokio::fs;

/// Upper bound and default for a `limit` query parameter.
#[derive(Debug, Clone, Copy)]
pub struct Limit {
    pub default: usize,
    pub max: usize,
}

pub const LOGS_LIMIT: Limit = Limit { default: 200, max: 5000 };
pub const CARRERAS_LIMIT: Limit = Limit { default: 5000, max: 20000 };
/// Window scanned to attach session users to the roster.
pub const SESSION_WINDOW: usize = 5000;

impl Limit {
    pub fn check(self, requested: Option<usize>) -> Result<usize, ServerError> {
        match requested {
            None => Ok(self.default),
            Some(value) if (1..=self.max).contains(&value) => Ok(value),
            Some(value) => Err(ServerError::LimitOutOfRange { value, max: self.max }),
        }
    }
}

/// Last `limit` lines of `path`, trimmed, blank ones dropped.
pub async fn read_last_lines(path: &Path, limit: usize) -> Result<Vec<String>, ServerError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ServerError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let txt = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = txt.lines().collect();
    let start = lines.len().saturating_sub(limit);
    Ok(lines[start..]
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn objects(lines: &[String]) -> impl Iterator<Item = Map<String, Value>> + '_ {
    lines.iter().filter_map(|l| match serde_json::from_str(l) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    })
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Entries whose `carrera` / `uid` equal the given values (absent filter = any).
pub fn filter_entries(lines: &[String], carrera: Option<&str>, username: Option<&str>) -> Vec<Value> {
    objects(lines)
        .filter(|obj| carrera.map_or(true, |c| obj.get("carrera").and_then(Value::as_str) == Some(c)))
        .filter(|obj| username.map_or(true, |u| obj.get("uid").and_then(Value::as_str) == Some(u)))
        .map(Value::Object)
        .collect()
}

/// Sorted distinct non-empty `carrera` values.
pub fn distinct_carreras(lines: &[String]) -> Vec<String> {
    let set: BTreeSet<String> = objects(lines)
        .filter_map(|obj| str_field(&obj, "carrera").map(str::to_string))
        .collect();
    set.into_iter().collect()
}

/// Who was last seen on a PC address.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub uid: String,
    pub carrera: Option<String>,
}

/// Latest identified user per client address; later lines win.
pub fn latest_sessions(lines: &[String]) -> HashMap<String, Session> {
    let mut sessions = HashMap::new();
    for obj in objects(lines) {
        let (Some(ip), Some(uid)) = (str_field(&obj, "ip"), str_field(&obj, "uid")) else {
            continue;
        };
        sessions.insert(
            ip.to_string(),
            Session {
                uid: uid.to_string(),
                carrera: str_field(&obj, "carrera").map(str::to_string),
            },
        );
    }
    sessions
}
