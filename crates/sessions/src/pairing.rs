//! Pairing challenge presentation.

use qrcode::render::unicode;
use qrcode::QrCode;

/// A challenge the operator must complete (scan) to link the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingChallenge {
    pub session: String,
    pub code: String,
}

impl PairingChallenge {
    /// Render the payload as a terminal QR code.
    pub fn render(&self) -> Result<String, qrcode::types::QrError> {
        let code = QrCode::new(self.code.as_bytes())?;
        Ok(code
            .render::<unicode::Dense1x2>()
            .quiet_zone(true)
            .build())
    }
}

/// Where pairing challenges are shown.
pub trait ChallengeSink: Send + Sync {
    fn present(&self, challenge: &PairingChallenge);
}

/// Prints challenges on the operator's terminal (stderr, so JSON logs on
/// stdout stay parseable).
pub struct ConsoleChallenge {
    render_qr: bool,
}

impl ConsoleChallenge {
    pub fn new(render_qr: bool) -> Self {
        Self { render_qr }
    }
}

impl ChallengeSink for ConsoleChallenge {
    fn present(&self, challenge: &PairingChallenge) {
        if self.render_qr {
            match challenge.render() {
                Ok(qr) => {
                    eprintln!(
                        "\nScan this code to link session \"{}\":\n{qr}",
                        challenge.session
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not render pairing QR, printing raw payload");
                }
            }
        }
        eprintln!(
            "\nPairing payload for session \"{}\": {}",
            challenge.session, challenge.code
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_block_characters() {
        let ch = PairingChallenge {
            session: "default".into(),
            code: "2@AbCdEf,123".into(),
        };
        let qr = ch.render().unwrap();
        assert!(qr.lines().count() > 10);
        assert!(qr.contains('█') || qr.contains('▀') || qr.contains('▄'));
    }
}
