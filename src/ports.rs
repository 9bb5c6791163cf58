use std::io::{BufRead, Write};

use crate::error::SelectionError;

pub const SELECTION_PROMPT: &str = "Select your Arduino by number: ";

/// Lists the serial devices the OS currently exposes, in enumeration order.
pub fn available_ports() -> crate::Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    log::debug!("found {} serial ports", ports.len());
    Ok(ports.into_iter().map(|port| port.port_name).collect())
}

pub fn print_ports(ports: &[String], out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Available serial ports:")?;
    for (index, port) in ports.iter().enumerate() {
        writeln!(out, "{index}: {port}")?;
    }
    Ok(())
}

/// Maps the operator's answer to one of `ports`. There is no fallback: any
/// answer that isn't a valid index is an error.
pub fn select_port(ports: &[String], input: &str) -> Result<String, SelectionError> {
    let input = input.trim();
    // Parse as signed so that "-1" is reported as out of range rather than as
    // not being a number.
    let index: i64 = input
        .parse()
        .map_err(|_| SelectionError::NotANumber(input.to_string()))?;
    usize::try_from(index)
        .ok()
        .and_then(|i| ports.get(i))
        .cloned()
        .ok_or(SelectionError::OutOfRange {
            index,
            available: ports.len(),
        })
}

pub fn prompt_for_port(
    ports: &[String],
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<String, SelectionError> {
    write!(out, "{SELECTION_PROMPT}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(SelectionError::NoInput);
    }
    select_port(ports, &line)
}
