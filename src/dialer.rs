use std::sync::Arc;

use log::{info, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::task::JoinHandle;

use crate::browser::Browser;
use crate::error::DialerError;
use crate::transport::Transport;
use crate::types::{DialRequest, MessageRequest};

/// Characters `encodeURIComponent` leaves alone, so paths match what the
/// CRM pages have always sent.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The number goes into the path exactly as given.
pub fn dial_path(request: &DialRequest) -> String {
    format!("/crm/util/dial/{}/", request.to_number)
}

pub fn send_message_path(request: &MessageRequest) -> String {
    format!(
        "/crm/util/send_message/{}/{}/",
        utf8_percent_encode(&request.to_number, URI_COMPONENT),
        utf8_percent_encode(&request.message, URI_COMPONENT),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialOutcome {
    /// The server asked for a different page; the browser was sent there.
    Redirected(String),
    /// The server refused the call; the message was alerted.
    Failed(String),
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Redirected(String),
    /// `after_send` was called with the server's message.
    Delivered,
}

/// A message to send plus the hooks run around the request.
pub struct MessageOptions<B, A> {
    pub request: MessageRequest,
    /// Runs once, before the request goes out.
    pub before_send: B,
    /// Runs once with the server's message unless the server redirects.
    pub after_send: A,
}

impl<B, A> MessageOptions<B, A>
where
    B: FnOnce(),
    A: FnOnce(Option<String>),
{
    pub fn new(
        to_number: impl Into<String>,
        message: impl Into<String>,
        before_send: B,
        after_send: A,
    ) -> Self {
        Self {
            request: MessageRequest {
                to_number: to_number.into(),
                message: message.into(),
            },
            before_send,
            after_send,
        }
    }
}

/// Click-to-dial and SMS client for the CRM's `/crm/util` endpoints.
///
/// Each call issues exactly one request and keeps nothing afterwards, so a
/// single `Dialer` can serve any number of concurrent operations.
pub struct Dialer<T, B> {
    transport: T,
    browser: B,
}

impl<T, B> Dialer<T, B>
where
    T: Transport,
    B: Browser,
{
    pub fn new(transport: T, browser: B) -> Self {
        Self { transport, browser }
    }

    pub async fn dial(&self, request: DialRequest) -> Result<DialOutcome, DialerError> {
        let path = dial_path(&request);
        info!("Dialing {}", request.to_number);

        let response = self.transport.get_json(&path).await?;

        if let Some(url) = response.redirect_target() {
            self.browser.navigate(url);
            return Ok(DialOutcome::Redirected(url.to_string()));
        }

        if !response.is_success() {
            let message = response.message.unwrap_or_default();
            warn!("Dial to {} refused: {}", request.to_number, message);
            self.browser.alert(&message);
            return Ok(DialOutcome::Failed(message));
        }

        Ok(DialOutcome::Connected)
    }

    pub async fn send_message<BS, AS>(
        &self,
        options: MessageOptions<BS, AS>,
    ) -> Result<SendOutcome, DialerError>
    where
        BS: FnOnce(),
        AS: FnOnce(Option<String>),
    {
        let MessageOptions {
            request,
            before_send,
            after_send,
        } = options;
        let path = send_message_path(&request);

        before_send();
        info!("Sending message to {}", request.to_number);

        let response = self.transport.get_json(&path).await?;

        if let Some(url) = response.redirect_target() {
            self.browser.navigate(url);
            return Ok(SendOutcome::Redirected(url.to_string()));
        }

        after_send(response.message);
        Ok(SendOutcome::Delivered)
    }
}

impl<T, B> Dialer<T, B>
where
    T: Transport + 'static,
    B: Browser + 'static,
{
    /// Starts a dial on the runtime and returns without waiting for it.
    pub fn dispatch_dial(
        self: &Arc<Self>,
        request: DialRequest,
    ) -> JoinHandle<Result<DialOutcome, DialerError>> {
        let dialer = Arc::clone(self);
        tokio::spawn(async move {
            let result = dialer.dial(request).await;
            match &result {
                Ok(outcome) => info!("Dial finished: {:?}", outcome),
                Err(e) => warn!("Dial request error: {}", e),
            }
            result
        })
    }

    /// Like [`Dialer::send_message`], but runs on the runtime. `before_send`
    /// still runs before the request is issued.
    pub fn dispatch_send_message<BS, AS>(
        self: &Arc<Self>,
        options: MessageOptions<BS, AS>,
    ) -> JoinHandle<Result<SendOutcome, DialerError>>
    where
        BS: FnOnce() + Send + 'static,
        AS: FnOnce(Option<String>) + Send + 'static,
    {
        let dialer = Arc::clone(self);
        tokio::spawn(async move {
            let result = dialer.send_message(options).await;
            match &result {
                Ok(outcome) => info!("Send finished: {:?}", outcome),
                Err(e) => warn!("Send request error: {}", e),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::types::ServerResponse;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        BeforeSend,
        Request(String),
        AfterSend(Option<String>),
        Navigate(String),
        Alert(String),
    }

    type Log = Arc<Mutex<Vec<Event>>>;

    /// Answers by path; unknown paths get `default`.
    struct FakeTransport {
        log: Log,
        responses: HashMap<String, (ServerResponse, Duration)>,
        default: ServerResponse,
    }

    impl FakeTransport {
        fn answering(log: &Log, default: ServerResponse) -> Self {
            Self {
                log: log.clone(),
                responses: HashMap::new(),
                default,
            }
        }

        fn route(mut self, path: &str, response: ServerResponse, delay: Duration) -> Self {
            self.responses.insert(path.to_string(), (response, delay));
            self
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get_json(&self, path: &str) -> Result<ServerResponse, DialerError> {
            self.log
                .lock()
                .unwrap()
                .push(Event::Request(path.to_string()));
            match self.responses.get(path) {
                Some((response, delay)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(response.clone())
                }
                None => Ok(self.default.clone()),
            }
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn get_json(&self, path: &str) -> Result<ServerResponse, DialerError> {
            Err(DialerError::Status {
                path: path.to_string(),
                status: reqwest::StatusCode::BAD_GATEWAY,
            })
        }
    }

    struct FakeBrowser {
        log: Log,
    }

    impl Browser for FakeBrowser {
        fn navigate(&self, url: &str) {
            self.log
                .lock()
                .unwrap()
                .push(Event::Navigate(url.to_string()));
        }

        fn alert(&self, message: &str) {
            self.log
                .lock()
                .unwrap()
                .push(Event::Alert(message.to_string()));
        }
    }

    fn dialer(log: &Log, transport: FakeTransport) -> Dialer<FakeTransport, FakeBrowser> {
        Dialer::new(transport, FakeBrowser { log: log.clone() })
    }

    fn options(
        log: &Log,
        to_number: &str,
        message: &str,
    ) -> MessageOptions<impl FnOnce() + Send + 'static, impl FnOnce(Option<String>) + Send + 'static>
    {
        let before = log.clone();
        let after = log.clone();
        MessageOptions::new(
            to_number,
            message,
            move || before.lock().unwrap().push(Event::BeforeSend),
            move |message| after.lock().unwrap().push(Event::AfterSend(message)),
        )
    }

    fn redirect(url: &str) -> ServerResponse {
        ServerResponse {
            redirect: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn events(log: &Log) -> Vec<Event> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn dial_path_keeps_number_verbatim() {
        assert_eq!(
            dial_path(&DialRequest::new("+1 (555) 123-4567")),
            "/crm/util/dial/+1 (555) 123-4567/"
        );
    }

    #[test]
    fn send_message_path_encodes_like_uri_components() {
        let request = MessageRequest {
            to_number: "+1 555/123".to_string(),
            message: "Call me back? It's urgent! (re: 50% off) ~ok* café".to_string(),
        };
        assert_eq!(
            send_message_path(&request),
            "/crm/util/send_message/%2B1%20555%2F123/\
             Call%20me%20back%3F%20It's%20urgent!%20(re%3A%2050%25%20off)%20~ok*%20caf%C3%A9/"
        );
    }

    #[tokio::test]
    async fn dial_issues_one_request_to_the_verbatim_path() {
        let log = Log::default();
        let dialer = dialer(&log, FakeTransport::answering(&log, ServerResponse::succeeded("ok")));

        dialer.dial(DialRequest::new("5551234")).await.unwrap();

        assert_eq!(
            events(&log),
            vec![Event::Request("/crm/util/dial/5551234/".to_string())]
        );
    }

    #[tokio::test]
    async fn dial_redirect_navigates_without_alert() {
        let log = Log::default();
        let mut response = redirect("/admin/ring_central/login/");
        response.success = Some(false);
        response.message = Some("login needed".to_string());
        let dialer = dialer(&log, FakeTransport::answering(&log, response));

        let outcome = dialer.dial(DialRequest::new("5551234")).await.unwrap();

        assert_eq!(
            outcome,
            DialOutcome::Redirected("/admin/ring_central/login/".to_string())
        );
        assert_eq!(
            events(&log),
            vec![
                Event::Request("/crm/util/dial/5551234/".to_string()),
                Event::Navigate("/admin/ring_central/login/".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn dial_failure_alerts_server_message() {
        let log = Log::default();
        let mut response = ServerResponse::failed("Invalid phone number", "Connecting");
        response.redirect = Some(String::new());
        let dialer = dialer(&log, FakeTransport::answering(&log, response));

        let outcome = dialer.dial(DialRequest::new("12")).await.unwrap();

        assert_eq!(outcome, DialOutcome::Failed("Invalid phone number".to_string()));
        assert_eq!(
            events(&log),
            vec![
                Event::Request("/crm/util/dial/12/".to_string()),
                Event::Alert("Invalid phone number".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn dial_with_missing_success_counts_as_failure() {
        let log = Log::default();
        let dialer = dialer(&log, FakeTransport::answering(&log, ServerResponse::default()));

        let outcome = dialer.dial(DialRequest::new("5551234")).await.unwrap();

        assert_eq!(outcome, DialOutcome::Failed(String::new()));
        assert!(events(&log).contains(&Event::Alert(String::new())));
    }

    #[tokio::test]
    async fn dial_success_is_silent() {
        let log = Log::default();
        let dialer = dialer(
            &log,
            FakeTransport::answering(&log, ServerResponse::succeeded("Call in progress")),
        );

        let outcome = dialer.dial(DialRequest::new("5551234")).await.unwrap();

        assert_eq!(outcome, DialOutcome::Connected);
        assert_eq!(events(&log).len(), 1);
    }

    #[tokio::test]
    async fn send_runs_before_send_ahead_of_the_request() {
        let log = Log::default();
        let dialer = dialer(
            &log,
            FakeTransport::answering(&log, ServerResponse::succeeded("Message sent")),
        );

        let outcome = dialer
            .send_message(options(&log, "+15551234", "hello there"))
            .await
            .unwrap();

        assert_eq!(outcome, SendOutcome::Delivered);
        assert_eq!(
            events(&log),
            vec![
                Event::BeforeSend,
                Event::Request("/crm/util/send_message/%2B15551234/hello%20there/".to_string()),
                Event::AfterSend(Some("Message sent".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn send_redirect_skips_after_send() {
        let log = Log::default();
        let dialer = dialer(&log, FakeTransport::answering(&log, redirect("/login/")));

        let outcome = dialer
            .send_message(options(&log, "5551234", "hi"))
            .await
            .unwrap();

        assert_eq!(outcome, SendOutcome::Redirected("/login/".to_string()));
        assert_eq!(
            events(&log),
            vec![
                Event::BeforeSend,
                Event::Request("/crm/util/send_message/5551234/hi/".to_string()),
                Event::Navigate("/login/".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn send_passes_none_when_server_omits_message() {
        let log = Log::default();
        let dialer = dialer(&log, FakeTransport::answering(&log, ServerResponse::default()));

        let outcome = dialer
            .send_message(options(&log, "5551234", "hi"))
            .await
            .unwrap();

        assert_eq!(outcome, SendOutcome::Delivered);
        let events = events(&log);
        assert!(events.contains(&Event::AfterSend(None)));
        assert!(!events.iter().any(|e| matches!(e, Event::Navigate(_))));
    }

    #[tokio::test]
    async fn send_forwards_message_even_when_server_reports_failure() {
        let log = Log::default();
        let dialer = dialer(
            &log,
            FakeTransport::answering(&log, ServerResponse::failed("Carrier rejected", "SMS")),
        );

        dialer
            .send_message(options(&log, "5551234", "hi"))
            .await
            .unwrap();

        let events = events(&log);
        assert_eq!(
            events.last(),
            Some(&Event::AfterSend(Some("Carrier rejected".to_string())))
        );
        assert!(!events.iter().any(|e| matches!(e, Event::Alert(_))));
    }

    #[tokio::test]
    async fn transport_errors_trigger_no_side_effects() {
        let log = Log::default();
        let dialer = Dialer::new(FailingTransport, FakeBrowser { log: log.clone() });

        let err = dialer.dial(DialRequest::new("5551234")).await.unwrap_err();
        assert!(matches!(err, DialerError::Status { .. }));

        let err = dialer
            .send_message(options(&log, "5551234", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, DialerError::Status { .. }));

        assert_eq!(events(&log), vec![Event::BeforeSend]);
    }

    #[tokio::test]
    async fn concurrent_operations_stay_independent() {
        let log = Log::default();
        let slow = dial_path(&DialRequest::new("111"));
        let transport = FakeTransport::answering(&log, ServerResponse::succeeded("Message sent"))
            .route(
                &slow,
                ServerResponse::failed("busy", "Ring-Out"),
                Duration::from_millis(50),
            )
            .route(
                "/crm/util/dial/222/",
                redirect("/elsewhere/"),
                Duration::from_millis(0),
            );
        let dialer = Arc::new(dialer(&log, transport));

        let first = dialer.dispatch_dial(DialRequest::new("111"));
        let second = dialer.dispatch_dial(DialRequest::new("222"));
        let third = dialer.dispatch_send_message(options(&log, "333", "hey"));

        assert_eq!(
            first.await.unwrap().unwrap(),
            DialOutcome::Failed("busy".to_string())
        );
        assert_eq!(
            second.await.unwrap().unwrap(),
            DialOutcome::Redirected("/elsewhere/".to_string())
        );
        assert_eq!(third.await.unwrap().unwrap(), SendOutcome::Delivered);

        let events = events(&log);
        let count = |wanted: &Event| events.iter().filter(|e| *e == wanted).count();
        assert_eq!(count(&Event::Alert("busy".to_string())), 1);
        assert_eq!(count(&Event::Navigate("/elsewhere/".to_string())), 1);
        assert_eq!(
            count(&Event::AfterSend(Some("Message sent".to_string()))),
            1
        );
        assert_eq!(events.len(), 7);

        let before = events.iter().position(|e| *e == Event::BeforeSend).unwrap();
        let request = events
            .iter()
            .position(|e| *e == Event::Request("/crm/util/send_message/333/hey/".to_string()))
            .unwrap();
        assert!(before < request);
    }
}
