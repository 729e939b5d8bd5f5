//! Result-stream row serialization.

use std::io::{self, Write};

/// Writes one record per line to the result stream, comma-delimited.
///
/// Rows are flushed as they are written so results stay visible while the
/// stream is piped, e.g. through `tee`.
pub struct RowWriter<W: Write> {
    out: W,
}

impl<W: Write> RowWriter<W> {
    pub fn new(out: W) -> Self {
        RowWriter { out }
    }

    /// Serialize one record as a single comma-delimited line.
    pub fn write_row<S: AsRef<str>>(&mut self, fields: &[S]) -> io::Result<()> {
        let line = fields
            .iter()
            .map(|field| field.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_comma_delimited_lines() {
        let mut writer = RowWriter::new(Vec::new());
        writer.write_row(&["test", "threads", "load"]).unwrap();
        writer.write_row(&["CPUStress", "4", "0"]).unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "test,threads,load\nCPUStress,4,0\n");
    }

    #[test]
    fn single_field_row_has_no_delimiter() {
        let mut writer = RowWriter::new(Vec::new());
        writer.write_row(&["alone"]).unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "alone\n");
    }

    #[test]
    fn accepts_owned_fields() {
        let mut writer = RowWriter::new(Vec::new());
        let fields = vec!["a".to_string(), "1.00".to_string()];
        writer.write_row(&fields).unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "a,1.00\n");
    }
}
