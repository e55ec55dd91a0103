use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::mailer::{MailTransport, Mailer};
use crate::metrics::{EMAILS_FAILED, EMAILS_SENT};
use crate::models::MailJob;

const MAIL_QUEUE_SIZE: usize = 100;

// Create the mail queue and spawn its single worker
pub fn spawn_mail_worker(transport: Arc<dyn MailTransport>) -> Mailer {
    let (tx, rx) = mpsc::channel::<MailJob>(MAIL_QUEUE_SIZE);
    tokio::spawn(mail_worker(rx, transport));
    Mailer::new(tx)
}

// Mail worker -> takes jobs from the queue and sends them one at a time
pub async fn mail_worker(mut rx: mpsc::Receiver<MailJob>, transport: Arc<dyn MailTransport>) {
    tracing::info!("mail worker started - sending emails sequentially");

    while let Some(job) = rx.recv().await {
        let email = job.email;
        let to = email.to.clone();

        // a panicking send only fails this job, the worker keeps going
        let send = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { transport.deliver(&email).await })
        };
        let result = match send.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "mail transport task failed");
                Err(DeliveryError::Panicked)
            }
        };

        match &result {
            Ok(()) => {
                EMAILS_SENT.inc();
                tracing::info!(to = %to, "email sent");
            }
            Err(e) => {
                EMAILS_FAILED.inc();
                tracing::error!(to = %to, error = %e, "failed to send email");
            }
        }

        // Send outcome back when someone is waiting for it
        if let Some(reply_tx) = job.reply_tx {
            let _ = reply_tx.send(result);
        }
    }

    tracing::info!("mail queue closed, mail worker stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::models::EmailRequest;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingTransport {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn deliver(&self, email: &EmailRequest) -> Result<(), DeliveryError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if email.to == "panic@example.com" {
                panic!("transport blew up");
            }
            if email.to == "reject@example.com" {
                return Err(DeliveryError::Smtp("550 mailbox unavailable".to_string()));
            }
            self.delivered.lock().push(email.to.clone());
            Ok(())
        }
    }

    fn email(to: &str) -> EmailRequest {
        EmailRequest {
            to: to.to_string(),
            subject: "hello".to_string(),
            body: "body".to_string(),
        }
    }

    fn start(transport: Arc<RecordingTransport>) -> Mailer {
        spawn_mail_worker(transport)
    }

    #[tokio::test]
    async fn sends_never_overlap() {
        let transport = Arc::new(RecordingTransport::default());
        let mailer = start(Arc::clone(&transport));

        let sends: Vec<_> = (0..10)
            .map(|i| {
                let mailer = mailer.clone();
                let to = format!("user{i}@example.com");
                tokio::spawn(async move { mailer.send(email(&to)).await })
            })
            .collect();
        for send in sends {
            send.await.unwrap().unwrap();
        }

        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(transport.delivered.lock().len(), 10);
    }

    #[tokio::test]
    async fn sync_send_surfaces_delivery_error() {
        let transport = Arc::new(RecordingTransport::default());
        let mailer = start(transport);

        let err = mailer.send(email("reject@example.com")).await.unwrap_err();
        assert!(matches!(err, RelayError::Delivery(DeliveryError::Smtp(_))));
    }

    #[tokio::test]
    async fn panicking_send_does_not_kill_worker() {
        let transport = Arc::new(RecordingTransport::default());
        let mailer = start(Arc::clone(&transport));

        let err = mailer.send(email("panic@example.com")).await.unwrap_err();
        assert!(matches!(err, RelayError::Delivery(DeliveryError::Panicked)));

        mailer.send(email("after@example.com")).await.unwrap();
        assert_eq!(*transport.delivered.lock(), vec!["after@example.com".to_string()]);
    }

    #[tokio::test]
    async fn scheduled_failures_stay_in_the_worker() {
        let transport = Arc::new(RecordingTransport::default());
        let mailer = start(Arc::clone(&transport));

        mailer.schedule(email("reject@example.com")).unwrap();
        // the queue is FIFO, so a later synchronous send observes the earlier one finished
        mailer.send(email("ok@example.com")).await.unwrap();
        assert_eq!(*transport.delivered.lock(), vec!["ok@example.com".to_string()]);
    }

    // Holds every delivery forever, like an SMTP server that stopped answering
    struct StalledTransport;

    #[async_trait]
    impl MailTransport for StalledTransport {
        async fn deliver(&self, _email: &EmailRequest) -> Result<(), DeliveryError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn stalled_delivery_never_blocks_schedule() {
        let mailer = spawn_mail_worker(Arc::new(StalledTransport));

        // the worker takes the first job and gets stuck on it
        mailer.schedule(email("first@example.com")).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        for i in 0..MAIL_QUEUE_SIZE {
            mailer.schedule(email(&format!("queued{i}@example.com"))).unwrap();
        }

        let overflow = tokio::time::timeout(Duration::from_millis(200), async {
            mailer.schedule(email("overflow@example.com"))
        })
        .await
        .expect("schedule waited on delivery");
        assert!(matches!(overflow, Err(RelayError::QueueFull)));
    }
}
