//! Mail relay connections.
//!
//! A connection is opened per delivery and released by a guard on every
//! exit path. Nothing is pooled.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use lettre::address::Envelope;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::DeliveryError;

/// One open, encrypted session with the relay.
pub trait RelayConnection: Send {
    fn authenticate(&mut self) -> Result<(), DeliveryError>;

    fn submit(&mut self, envelope: &Envelope, message: &[u8]) -> Result<(), DeliveryError>;

    /// Release the session. Called exactly once, by [`ScopedConnection`].
    fn close(&mut self);
}

/// Opens relay sessions.
pub trait RelayConnector: Send + Sync {
    fn open(&self) -> Result<Box<dyn RelayConnection>, DeliveryError>;
}

/// Closes the wrapped connection when dropped.
pub struct ScopedConnection {
    inner: Box<dyn RelayConnection>,
}

impl ScopedConnection {
    pub fn new(inner: Box<dyn RelayConnection>) -> Self {
        Self { inner }
    }
}

impl Deref for ScopedConnection {
    type Target = dyn RelayConnection;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for ScopedConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        self.inner.close();
    }
}

/// Open, authenticate, submit. Blocking; the connection is released
/// before this returns, whatever the outcome.
///
/// The budget is checked before each step. Once submission has started it
/// runs to completion, so a reported timeout always means nothing was sent.
pub fn transmit(
    relay: &dyn RelayConnector,
    envelope: &Envelope,
    message: &[u8],
    budget: Duration,
) -> Result<(), DeliveryError> {
    let started = Instant::now();
    let within_budget = || {
        if started.elapsed() >= budget {
            Err(DeliveryError::Timeout(budget))
        } else {
            Ok(())
        }
    };

    let mut conn = ScopedConnection::new(relay.open()?);
    within_budget()?;
    conn.authenticate()?;
    within_budget()?;
    conn.submit(envelope, message)
}

/// Relay settings.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub timeout: Duration,
}

/// SMTP relay over implicit TLS (SMTPS) using lettre's low-level client.
#[derive(Debug, Clone)]
pub struct SmtpRelay {
    settings: SmtpSettings,
}

impl SmtpRelay {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }
}

impl RelayConnector for SmtpRelay {
    fn open(&self) -> Result<Box<dyn RelayConnection>, DeliveryError> {
        let s = &self.settings;
        let connect_err = |reason: String| DeliveryError::Connect {
            host: format!("{}:{}", s.host, s.port),
            reason,
        };

        let tls = TlsParameters::new(s.host.clone()).map_err(|e| connect_err(e.to_string()))?;
        let conn = SmtpConnection::connect(
            (s.host.as_str(), s.port),
            Some(s.timeout),
            &ClientId::default(),
            Some(&tls),
            None,
        )
        .map_err(|e| connect_err(e.to_string()))?;

        debug!(host = %s.host, port = s.port, "Relay connection opened");

        Ok(Box::new(SmtpSession {
            conn,
            credentials: Credentials::new(
                s.username.clone(),
                s.password.expose_secret().to_string(),
            ),
        }))
    }
}

struct SmtpSession {
    conn: SmtpConnection,
    credentials: Credentials,
}

impl RelayConnection for SmtpSession {
    fn authenticate(&mut self) -> Result<(), DeliveryError> {
        self.conn
            .auth(&[Mechanism::Plain, Mechanism::Login], &self.credentials)
            .map(|_| ())
            .map_err(|e| DeliveryError::AuthFailed(e.to_string()))
    }

    fn submit(&mut self, envelope: &Envelope, message: &[u8]) -> Result<(), DeliveryError> {
        self.conn
            .send(envelope, message)
            .map(|_| ())
            .map_err(|e| DeliveryError::SubmitFailed(e.to_string()))
    }

    fn close(&mut self) {
        // Sends QUIT unless the session is already broken, then shuts the socket.
        self.conn.abort();
        debug!("Relay connection closed");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Scripted relay that counts opens and closes and keeps what it was sent.
    #[derive(Default)]
    pub struct FakeRelay {
        pub refuse_connect: bool,
        pub reject_auth: bool,
        pub reject_submit: bool,
        pub auth_delay: Duration,
        pub submit_delay: Duration,
        pub opened: Arc<AtomicUsize>,
        pub closed: Arc<AtomicUsize>,
        pub submitted: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl FakeRelay {
        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        pub fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    struct FakeSession {
        reject_auth: bool,
        reject_submit: bool,
        auth_delay: Duration,
        submit_delay: Duration,
        closed: Arc<AtomicUsize>,
        submitted: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl RelayConnector for FakeRelay {
        fn open(&self) -> Result<Box<dyn RelayConnection>, DeliveryError> {
            if self.refuse_connect {
                return Err(DeliveryError::Connect {
                    host: "relay.test:465".into(),
                    reason: "connection refused".into(),
                });
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                reject_auth: self.reject_auth,
                reject_submit: self.reject_submit,
                auth_delay: self.auth_delay,
                submit_delay: self.submit_delay,
                closed: Arc::clone(&self.closed),
                submitted: Arc::clone(&self.submitted),
            }))
        }
    }

    impl RelayConnection for FakeSession {
        fn authenticate(&mut self) -> Result<(), DeliveryError> {
            std::thread::sleep(self.auth_delay);
            if self.reject_auth {
                Err(DeliveryError::AuthFailed(
                    "permanent error (535): Username and Password not accepted".into(),
                ))
            } else {
                Ok(())
            }
        }

        fn submit(&mut self, _envelope: &Envelope, message: &[u8]) -> Result<(), DeliveryError> {
            std::thread::sleep(self.submit_delay);
            if self.reject_submit {
                return Err(DeliveryError::SubmitFailed(
                    "permanent error (552): message size exceeds limit".into(),
                ));
            }
            self.submitted.lock().unwrap().push(message.to_vec());
            Ok(())
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeRelay;
    use super::*;

    const BUDGET: Duration = Duration::from_secs(5);

    fn envelope() -> Envelope {
        Envelope::new(
            Some("sender@firm.test".parse().unwrap()),
            vec!["clerk@town.test".parse().unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn success_releases_once() {
        let relay = FakeRelay::default();
        transmit(&relay, &envelope(), b"message", BUDGET).unwrap();
        assert_eq!(relay.opened(), 1);
        assert_eq!(relay.closed(), 1);
        assert_eq!(relay.submitted.lock().unwrap().len(), 1);
    }

    #[test]
    fn auth_failure_releases_once() {
        let relay = FakeRelay {
            reject_auth: true,
            ..Default::default()
        };
        let err = transmit(&relay, &envelope(), b"message", BUDGET).unwrap_err();
        assert!(matches!(err, DeliveryError::AuthFailed(_)));
        assert_eq!(relay.closed(), 1);
        assert!(relay.submitted.lock().unwrap().is_empty());
    }

    #[test]
    fn submit_failure_releases_once() {
        let relay = FakeRelay {
            reject_submit: true,
            ..Default::default()
        };
        let err = transmit(&relay, &envelope(), b"message", BUDGET).unwrap_err();
        assert!(matches!(err, DeliveryError::SubmitFailed(_)));
        assert_eq!(relay.closed(), 1);
    }

    #[test]
    fn repeated_failures_leak_nothing() {
        let relay = FakeRelay {
            reject_auth: true,
            reject_submit: true,
            ..Default::default()
        };
        for _ in 0..5 {
            assert!(transmit(&relay, &envelope(), b"message", BUDGET).is_err());
        }
        assert_eq!(relay.opened(), 5);
        assert_eq!(relay.closed(), 5);
    }

    #[test]
    fn refused_connection_has_nothing_to_release() {
        let relay = FakeRelay {
            refuse_connect: true,
            ..Default::default()
        };
        let err = transmit(&relay, &envelope(), b"message", BUDGET).unwrap_err();
        assert!(matches!(err, DeliveryError::Connect { .. }));
        assert_eq!(relay.opened(), 0);
        assert_eq!(relay.closed(), 0);
    }

    #[test]
    fn exhausted_budget_stops_before_submit() {
        let relay = FakeRelay {
            auth_delay: Duration::from_millis(150),
            ..Default::default()
        };
        let err =
            transmit(&relay, &envelope(), b"message", Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, DeliveryError::Timeout(_)));
        assert!(relay.submitted.lock().unwrap().is_empty());
        assert_eq!(relay.closed(), 1);
    }

    #[test]
    fn started_submission_completes() {
        let relay = FakeRelay {
            submit_delay: Duration::from_millis(150),
            ..Default::default()
        };
        transmit(&relay, &envelope(), b"message", Duration::from_millis(50)).unwrap();
        assert_eq!(relay.submitted.lock().unwrap().len(), 1);
        assert_eq!(relay.closed(), 1);
    }
}
