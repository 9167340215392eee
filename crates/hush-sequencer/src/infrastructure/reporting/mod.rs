//! Chart output for external plotting tools.

use std::io::Write;

use hush_core::LatencyChart;

use crate::application::report_trials::{ChartSink, ReportError};

/// Writes each published chart as one JSON document followed by a newline.
pub struct JsonChartSink<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonChartSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ChartSink for JsonChartSink<W> {
    fn publish(&mut self, chart: &LatencyChart) -> Result<(), ReportError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, chart)?;
        } else {
            serde_json::to_writer(&mut self.writer, chart)?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
