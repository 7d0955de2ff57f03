/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt::{self, Arguments, Write as _};
use std::io::{self, Write};

use chrono::Local;
use slog::{Drain, KV, OwnedKVList, Record, Serializer, slog_o};
use slog_scope::GlobalLoggerGuard;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Write one plain text line per record to stderr.
struct StdErrDrain {
    append_code_position: bool,
}

impl StdErrDrain {
    fn format(&self, record: &Record, values: &OwnedKVList) -> Result<String, fmt::Error> {
        let mut line = String::with_capacity(256);
        write!(line, "{} {}", Local::now().format(TIME_FORMAT), record.level())?;

        let mut kv = FormatterKv(&mut line);
        values
            .serialize(record, &mut kv)
            .map_err(|_| fmt::Error)?;
        record
            .kv()
            .serialize(record, &mut kv)
            .map_err(|_| fmt::Error)?;

        let message = record.msg().to_string();
        if message.is_empty() {
            line.push_str(" ()");
        } else {
            write!(line, " {message}")?;
        }
        if self.append_code_position {
            write!(line, " <{}:{}>", record.file(), record.line())?;
        }
        line.push('\n');
        Ok(line)
    }
}

impl Drain for StdErrDrain {
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> Result<Self::Ok, Self::Err> {
        let line = self
            .format(record, values)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let mut stderr = io::stderr().lock();
        stderr.write_all(line.as_bytes())?;
        stderr.flush()
    }
}

struct FormatterKv<'a>(&'a mut String);

impl Serializer for FormatterKv<'_> {
    fn emit_arguments(&mut self, key: slog::Key, value: &Arguments) -> slog::Result {
        write!(self.0, " {key}: {value},")?;
        Ok(())
    }
}

/// Install the process logger, with `log` records bridged into it.
///
/// The returned guard should be kept alive until the process exits.
pub fn setup(verbose_level: u8) -> Result<GlobalLoggerGuard, log::SetLoggerError> {
    let drain = StdErrDrain {
        append_code_position: verbose_level > 1,
    };
    let logger = slog::Logger::root(drain.ignore_res(), slog_o!());

    let scope_guard = slog_scope::set_global_logger(logger);

    let log_level = match verbose_level {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    };

    slog_stdlog::init_with_level(log_level)?;
    Ok(scope_guard)
}
