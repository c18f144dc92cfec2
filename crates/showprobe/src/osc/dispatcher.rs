use std::io::Write;
use std::sync::Mutex;

use tracing::warn;

use super::AddressPattern;
use super::OscMessage;
use super::Result;

/// Callback invoked for each dispatched message.
///
/// Handlers run inline on the receive loop, in arrival order.
pub trait Handler: Send + Sync {
    fn handle(&self, msg: &OscMessage);
}

impl<F> Handler for F
where
    F: Fn(&OscMessage) + Send + Sync,
{
    fn handle(&self, msg: &OscMessage) {
        self(msg)
    }
}

/// Routes messages to handlers by address pattern.
#[derive(Default)]
pub struct Dispatcher {
    routes: Vec<(AddressPattern, Box<dyn Handler>)>,
    default: Option<Box<dyn Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every address matching `pattern`
    pub fn map(&mut self, pattern: &str, handler: impl Handler + 'static) -> Result<()> {
        let pattern = AddressPattern::new(pattern)?;
        self.routes.push((pattern, Box::new(handler)));
        Ok(())
    }

    /// Handler for messages that no mapped pattern matched
    pub fn set_default_handler(&mut self, handler: impl Handler + 'static) {
        self.default = Some(Box::new(handler));
    }

    /// Invoke every matching handler, in registration order, falling back to
    /// the default handler. Returns the number of handlers invoked.
    pub fn dispatch(&self, msg: &OscMessage) -> usize {
        let mut invoked = 0;
        for (pattern, handler) in &self.routes {
            if pattern.matches(&msg.addr) {
                handler.handle(msg);
                invoked += 1;
            }
        }

        if invoked == 0 {
            if let Some(default) = &self.default {
                default.handle(msg);
                invoked = 1;
            }
        }

        invoked
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field(
                "routes",
                &self.routes.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>(),
            )
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Writes one line per message:
/// `Received OSC message: <addr> with arguments: [<args>]`
pub struct PrintHandler<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> PrintHandler<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn write_line(&self, msg: &OscMessage) -> std::io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        write!(out, "Received OSC message: {} with arguments: [", msg.addr)?;
        for (i, arg) in msg.args.iter().enumerate() {
            if i > 0 {
                out.write_all(b", ")?;
            }
            write!(out, "{}", arg)?;
        }
        out.write_all(b"]\n")?;
        out.flush()
    }
}

impl<W: Write + Send> Handler for PrintHandler<W> {
    fn handle(&self, msg: &OscMessage) {
        if let Err(e) = self.write_line(msg) {
            warn!("Failed to print OSC message {}: {}", msg.addr, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::osc::OscArg;

    fn msg(addr: &str) -> OscMessage {
        OscMessage::new(addr, vec![]).unwrap()
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Handler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |m: &OscMessage| sink.lock().unwrap().push(m.addr.clone()))
    }

    #[test]
    fn test_default_handler_catches_everything() {
        let (seen, handler) = recorder();
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_default_handler(handler);

        assert_eq!(dispatcher.dispatch(&msg("/test/addr")), 1);
        assert_eq!(dispatcher.dispatch(&msg("/msc/go/1")), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["/test/addr", "/msc/go/1"]);
    }

    #[test]
    fn test_mapped_routes_take_precedence() {
        let (mapped, mapped_handler) = recorder();
        let (fallback, fallback_handler) = recorder();
        let mut dispatcher = Dispatcher::new();
        dispatcher.map("/msc/*/*", mapped_handler).unwrap();
        dispatcher.set_default_handler(fallback_handler);

        dispatcher.dispatch(&msg("/msc/go/1"));
        dispatcher.dispatch(&msg("/other"));

        assert_eq!(*mapped.lock().unwrap(), vec!["/msc/go/1"]);
        assert_eq!(*fallback.lock().unwrap(), vec!["/other"]);
    }

    #[test]
    fn test_every_matching_route_runs() {
        let (a, a_handler) = recorder();
        let (b, b_handler) = recorder();
        let mut dispatcher = Dispatcher::new();
        dispatcher.map("/msc/go/*", a_handler).unwrap();
        dispatcher.map("/msc/{go,stop}/1", b_handler).unwrap();

        assert_eq!(dispatcher.dispatch(&msg("/msc/go/1")), 2);
        assert_eq!(dispatcher.dispatch(&msg("/msc/stop/1")), 1);
        assert_eq!(a.lock().unwrap().len(), 1);
        assert_eq!(b.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_unmatched_without_default() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.dispatch(&msg("/nobody/home")), 0);
    }

    #[test]
    fn test_map_rejects_bad_pattern() {
        let mut dispatcher = Dispatcher::new();
        assert!(dispatcher.map("no-slash", |_: &OscMessage| {}).is_err());
    }

    #[test]
    fn test_print_handler_line() {
        let handler = PrintHandler::new(Vec::new());
        handler.handle(
            &OscMessage::new(
                "/test/addr",
                vec![OscArg::Int(1), OscArg::String("a".into())],
            )
            .unwrap(),
        );
        handler.handle(&msg("/empty"));

        let out = String::from_utf8(handler.into_inner()).unwrap();
        insta::assert_snapshot!(out, @r#"
        Received OSC message: /test/addr with arguments: [1, "a"]
        Received OSC message: /empty with arguments: []
        "#);
    }
}
