//! Reporting of denied requests

use super::ruleset::SourceAddr;
use tracing::warn;

/// Which check refused a request, with the value it refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    Hostname(String),
    Source,
    Port(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub client_addr: SourceAddr,
    pub reason: DenialReason,
}

/// Receiver for denial events emitted by the rule set
pub trait DenialSink: Send + Sync {
    fn denied(&self, denial: &Denial);
}

/// Logs each denial as a `"denied access"` warning
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DenialSink for TracingSink {
    fn denied(&self, denial: &Denial) {
        let client_addr = &denial.client_addr;
        match &denial.reason {
            DenialReason::Hostname(fqdn) => {
                warn!(client_addr = %client_addr, fqdn = %fqdn, "denied access")
            }
            DenialReason::Source => warn!(client_addr = %client_addr, "denied access"),
            DenialReason::Port(port) => {
                warn!(client_addr = %client_addr, dest_port = *port, "denied access")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(denial: &Denial) -> String {
        let writer = CaptureWriter::default();
        let out = writer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || TracingSink.denied(denial));

        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn client() -> SourceAddr {
        SourceAddr::Inet("10.1.2.3:50000".parse().unwrap())
    }

    #[test]
    fn test_hostname_denial_fields() {
        let line = capture(&Denial {
            client_addr: client(),
            reason: DenialReason::Hostname("www.2ch.net".to_string()),
        });

        assert!(line.contains("WARN"), "{line}");
        assert!(line.contains("denied access"), "{line}");
        assert!(line.contains("client_addr=10.1.2.3:50000"), "{line}");
        assert!(line.contains("fqdn=www.2ch.net"), "{line}");
        assert!(!line.contains("dest_port"), "{line}");
    }

    #[test]
    fn test_source_denial_fields() {
        let line = capture(&Denial {
            client_addr: client(),
            reason: DenialReason::Source,
        });

        assert!(line.contains("denied access"), "{line}");
        assert!(line.contains("client_addr=10.1.2.3:50000"), "{line}");
        assert!(!line.contains("fqdn"), "{line}");
    }

    #[test]
    fn test_port_denial_fields() {
        let line = capture(&Denial {
            client_addr: client(),
            reason: DenialReason::Port(25),
        });

        assert!(line.contains("denied access"), "{line}");
        assert!(line.contains("client_addr=10.1.2.3:50000"), "{line}");
        assert!(line.contains("dest_port=25"), "{line}");
    }
}
