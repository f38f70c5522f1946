use tracing::trace;

use super::assertion::Assertion;
use super::error::Error;
use crate::http::response::Response;

/// Decides the single failure of a finished round trip.
///
/// Without a response the transport error wins outright and no assertion
/// runs. Otherwise assertions run in declaration order and the first failure
/// stops the queue. A transport error that no assertion could observe is
/// surfaced last, unless it carries the same status as the response.
pub(crate) fn evaluate(
    assertions: &mut [Assertion],
    response: Option<&mut Response>,
    transport: Option<Error>,
) -> Option<Error> {
    let Some(res) = response else {
        return Some(
            transport
                .map(Error::normalize)
                .unwrap_or_else(|| Error::Usage("request finished without a response".into())),
        );
    };

    for (index, assertion) in assertions.iter_mut().enumerate() {
        if let Err(err) = assertion.run(res) {
            trace!(index, "assertion failed");
            return Some(Error::Assertion(err));
        }
    }

    transport.filter(|err| err.status() != Some(res.status))
}
