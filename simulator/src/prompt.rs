use crate::errors::Result;
use crate::model::Device;
use std::io::{self, BufRead, Write};

pub fn render_device(device: &Device) -> Result<String> {
    Ok(serde_json::to_string_pretty(device)?)
}

/// Ask whether to begin metering. Only `y` (any case) counts as yes.
pub fn confirm_start(mut input: impl BufRead, mut output: impl Write) -> io::Result<bool> {
    writeln!(output, "Begin Metering? (y/n)")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
