use log::trace;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::{
    io::{Read, Write},
    sync::{Arc, Mutex},
    time::Duration,
};

/// An implementation of [serialport::SerialPort] that doesn't actually connect
/// to a serial port. Every write is recorded, and clones share the record, so
/// hang onto a clone to see what got sent.
#[derive(Clone, Debug)]
pub struct MockSerialPort {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    baud_rate: u32,
    timeout: Duration,
    data_bits: DataBits,
    flow_control: FlowControl,
    stop_bits: StopBits,
    parity: Parity,
}

impl MockSerialPort {
    /// Everything written so far, one entry per write call
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().map(|writes| writes.clone()).unwrap_or_default()
    }
}

impl Default for MockSerialPort {
    fn default() -> Self {
        Self {
            writes: Default::default(),
            baud_rate: 9600,
            timeout: Duration::default(),
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}

impl Read for MockSerialPort {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(0)
    }
}

impl Write for MockSerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        trace!("Mock write {buf:x?}");
        self.writes
            .lock()
            .map_err(|err| std::io::Error::other(err.to_string()))?
            .push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SerialPort for MockSerialPort {
    fn name(&self) -> Option<String> {
        Some("Mock Serial Port".into())
    }

    fn baud_rate(&self) -> serialport::Result<u32> {
        Ok(self.baud_rate)
    }

    fn data_bits(&self) -> serialport::Result<DataBits> {
        Ok(self.data_bits)
    }

    fn flow_control(&self) -> serialport::Result<FlowControl> {
        Ok(self.flow_control)
    }

    fn parity(&self) -> serialport::Result<Parity> {
        Ok(self.parity)
    }

    fn stop_bits(&self) -> serialport::Result<StopBits> {
        Ok(self.stop_bits)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> serialport::Result<()> {
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn set_data_bits(&mut self, data_bits: DataBits) -> serialport::Result<()> {
        self.data_bits = data_bits;
        Ok(())
    }

    fn set_flow_control(
        &mut self,
        flow_control: FlowControl,
    ) -> serialport::Result<()> {
        self.flow_control = flow_control;
        Ok(())
    }

    fn set_parity(&mut self, parity: Parity) -> serialport::Result<()> {
        self.parity = parity;
        Ok(())
    }

    fn set_stop_bits(&mut self, stop_bits: StopBits) -> serialport::Result<()> {
        self.stop_bits = stop_bits;
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> serialport::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn write_request_to_send(
        &mut self,
        _level: bool,
    ) -> serialport::Result<()> {
        Ok(())
    }

    fn write_data_terminal_ready(
        &mut self,
        _level: bool,
    ) -> serialport::Result<()> {
        Ok(())
    }

    fn read_clear_to_send(&mut self) -> serialport::Result<bool> {
        Ok(true)
    }

    fn read_data_set_ready(&mut self) -> serialport::Result<bool> {
        Ok(true)
    }

    fn read_ring_indicator(&mut self) -> serialport::Result<bool> {
        Ok(false)
    }

    fn read_carrier_detect(&mut self) -> serialport::Result<bool> {
        Ok(true)
    }

    fn bytes_to_read(&self) -> serialport::Result<u32> {
        Ok(0)
    }

    fn bytes_to_write(&self) -> serialport::Result<u32> {
        Ok(0)
    }

    fn clear(
        &self,
        _buffer_to_clear: serialport::ClearBuffer,
    ) -> serialport::Result<()> {
        Ok(())
    }

    fn try_clone(&self) -> serialport::Result<Box<dyn SerialPort>> {
        Ok(Box::new(self.clone()))
    }

    fn set_break(&self) -> serialport::Result<()> {
        Ok(())
    }

    fn clear_break(&self) -> serialport::Result<()> {
        Ok(())
    }
}
