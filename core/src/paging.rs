//! Lazy iteration over paginated collections.
//!
//! A paginated call is requested first without a continuation token; every
//! page that carries a `continuationToken` asks for one more request. The
//! sequence is finite and can be restarted from scratch by building a new
//! `Pages`, but a lost token cannot be resumed mid-way.

use std::iter::FusedIterator;

use serde_json::Value;

use crate::client::WebClient;
use crate::descriptor::CallDescriptor;
use crate::error::ApiError;
use crate::http::Transport;

/// Response key carrying the token for the next page.
pub const CONTINUATION_TOKEN: &str = "continuationToken";

/// Builds a call's parameter object from an optional continuation token.
pub type PageArgs<A> = fn(Option<String>) -> A;

/// Iterator over the validated pages of one paginated call.
///
/// Requests are only made as the iterator is advanced. A failed page is
/// yielded once and ends the sequence.
pub struct Pages<'a, A, T: ?Sized> {
    client: &'a WebClient,
    transport: &'a T,
    call: &'a CallDescriptor<A>,
    page_args: PageArgs<A>,
    // `None` once the sequence is finished; `Some(None)` before the first page.
    next_token: Option<Option<String>>,
}

impl<'a, A, T: Transport + ?Sized> Pages<'a, A, T> {
    pub fn new(
        client: &'a WebClient,
        transport: &'a T,
        call: &'a CallDescriptor<A>,
        page_args: PageArgs<A>,
    ) -> Self {
        Self {
            client,
            transport,
            call,
            page_args,
            next_token: Some(None),
        }
    }
}

impl<A, T: Transport + ?Sized> Iterator for Pages<'_, A, T> {
    type Item = Result<Value, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token.take()?;
        let args = (self.page_args)(token);
        match self.client.call(self.transport, self.call, &args) {
            Ok(page) => {
                self.next_token = continuation_token(&page).map(Some);
                if self.next_token.is_none() {
                    tracing::debug!(call = self.call.name(), "last page reached");
                }
                Some(Ok(page))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

impl<A, T: Transport + ?Sized> FusedIterator for Pages<'_, A, T> {}

/// The token for the page after `page`, if there is one.
///
/// Empty tokens count as absent.
pub fn continuation_token(page: &Value) -> Option<String> {
    page.get(CONTINUATION_TOKEN)
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
