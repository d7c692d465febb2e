//! MIDI output using midir
use midir::{MidiOutput, MidiOutputConnection};

use crate::error::DeviceError;

/// Anything the playback engine can push raw MIDI messages into.
pub trait MidiSink: Send {
    fn send(&mut self, message: &[u8]) -> Result<(), DeviceError>;
}

pub struct MidiOutputDevice {
    client_name: String,
    connection: Option<MidiOutputConnection>,
    port_name: Option<String>,
}

impl MidiOutputDevice {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            connection: None,
            port_name: None,
        }
    }

    pub fn available_ports(client_name: &str) -> Vec<String> {
        match MidiOutput::new(client_name) {
            Ok(midi_out) => midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect(),
            Err(e) => {
                tracing::warn!("MIDI output unavailable: {}", e);
                vec![]
            }
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<(), DeviceError> {
        let midi_out = MidiOutput::new(&self.client_name)?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or_else(|| DeviceError::PortNotFound(format!("#{port_index}")))?;
        let name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| format!("#{port_index}"));

        let connection = midi_out
            .connect(port, "beatbox-out")
            .map_err(|e| DeviceError::Connect(e.to_string()))?;

        tracing::info!("connected MIDI output {}", name);
        self.connection = Some(connection);
        self.port_name = Some(name);
        Ok(())
    }

    pub fn connect_by_name(&mut self, name: &str) -> Result<(), DeviceError> {
        let index = Self::available_ports(&self.client_name)
            .iter()
            .position(|p| p == name)
            .ok_or_else(|| DeviceError::PortNotFound(name.to_string()))?;
        self.connect(index)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
        self.port_name = None;
    }
}

impl MidiSink for MidiOutputDevice {
    fn send(&mut self, message: &[u8]) -> Result<(), DeviceError> {
        let conn = self.connection.as_mut().ok_or(DeviceError::NotOpen)?;
        conn.send(message)?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconnected_device_rejects_send() {
        let mut device = MidiOutputDevice::new("BeatBox test");
        assert!(!device.is_connected());
        assert!(matches!(
            device.send(&[0x99, 35, 100]),
            Err(DeviceError::NotOpen)
        ));
    }

    #[test]
    fn test_disconnect_clears_port_name() {
        let mut device = MidiOutputDevice::new("BeatBox test");
        device.disconnect();
        assert_eq!(device.port_name(), None);
    }
}
