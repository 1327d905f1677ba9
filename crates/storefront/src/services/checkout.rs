//! Checkout notification email.
//!
//! The notifier receives the figures a shopper confirmed at checkout,
//! re-derives the total from the line items, and refuses to send anything
//! that does not add up. Accepted snapshots are rendered with askama (HTML
//! and plain text) and handed to a lettre transport as one multipart
//! message.

use askama::Template;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use toko_core::{Email, Price};

use crate::config::EmailConfig;
use crate::models::CartLine;

/// Subject line of the checkout email.
pub const CHECKOUT_SUBJECT: &str = "Checkout Sedang Diproses";

/// Shown instead of an amount when no discount applies.
const NO_DISCOUNT: &str = "Tidak ada";

/// SMTP-backed notifier used by the running server.
pub type SmtpCheckoutNotifier = CheckoutNotifier<AsyncSmtpTransport<Tokio1Executor>>;

/// Errors that can occur when verifying or sending a checkout email.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// There is nothing to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// Discount, shipping fee, or total is below zero.
    #[error("{0} must not be negative")]
    NegativeAmount(&'static str),

    /// An amount is too large to add up.
    #[error("amounts are out of range")]
    AmountOutOfRange,

    /// The supplied total disagrees with the line items.
    #[error("total mismatch: expected {expected}, got {supplied}")]
    TotalMismatch { expected: Price, supplied: Price },

    /// Template rendering error.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    /// Sender or recipient address is not deliverable.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Failed to build the MIME message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// SMTP setup failed.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The transport rejected the message.
    #[error("failed to send email")]
    SendFailed,
}

/// Product fields the email needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutProduct {
    pub name: String,
    pub price: Price,
}

/// One purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutLine {
    pub product: CheckoutProduct,
    pub quantity: i32,
}

impl CheckoutLine {
    fn line_total(&self) -> Option<Price> {
        self.product.price.checked_times(self.quantity)
    }
}

impl From<&CartLine> for CheckoutLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product: CheckoutProduct {
                name: line.product.name.clone(),
                price: line.product.price,
            },
            quantity: line.quantity,
        }
    }
}

/// The finalized cart and amounts handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSnapshot {
    pub items: Vec<CheckoutLine>,
    pub discount: Price,
    pub shipping_fee: Price,
    pub total: Price,
}

impl CheckoutSnapshot {
    /// Snapshot a swept cart together with the figures the shopper confirmed.
    #[must_use]
    pub fn from_cart(items: &[CartLine], discount: Price, shipping_fee: Price, total: Price) -> Self {
        Self {
            items: items.iter().map(CheckoutLine::from).collect(),
            discount,
            shipping_fee,
            total,
        }
    }

    /// `sum(price * quantity) - discount + shipping_fee`, or `None` on overflow.
    #[must_use]
    pub fn expected_total(&self) -> Option<Price> {
        let subtotal = self
            .items
            .iter()
            .try_fold(Price::ZERO, |acc, line| acc.checked_add(line.line_total()?))?;
        subtotal
            .checked_sub(self.discount)?
            .checked_add(self.shipping_fee)
    }

    /// Check that the snapshot is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there are no items.
    /// Returns `CheckoutError::NegativeAmount` if any amount is below zero.
    /// Returns `CheckoutError::AmountOutOfRange` if the amounts overflow.
    /// Returns `CheckoutError::TotalMismatch` if `total` is not the expected total.
    pub fn verify(&self) -> Result<(), CheckoutError> {
        if self.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        for (field, amount) in [
            ("discount", self.discount),
            ("shipping_fee", self.shipping_fee),
            ("total", self.total),
        ] {
            if amount.is_negative() {
                return Err(CheckoutError::NegativeAmount(field));
            }
        }

        let expected = self
            .expected_total()
            .ok_or(CheckoutError::AmountOutOfRange)?;
        if expected != self.total {
            return Err(CheckoutError::TotalMismatch {
                expected,
                supplied: self.total,
            });
        }
        Ok(())
    }
}

struct EmailRow<'a> {
    name: &'a str,
    quantity: i32,
    unit_price: String,
}

/// HTML template for the checkout email.
#[derive(Template)]
#[template(path = "email/checkout.html")]
struct CheckoutEmailHtml<'a> {
    rows: &'a [EmailRow<'a>],
    discount: &'a str,
    shipping_fee: &'a str,
    total: &'a str,
}

/// Plain text template for the checkout email.
#[derive(Template)]
#[template(path = "email/checkout.txt")]
struct CheckoutEmailText<'a> {
    rows: &'a [EmailRow<'a>],
    discount: &'a str,
    shipping_fee: &'a str,
    total: &'a str,
}

/// Rendered bodies of a checkout email.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub html: String,
    pub text: String,
}

/// Render both bodies of the checkout email.
///
/// # Errors
///
/// Returns `CheckoutError::Template` if rendering fails.
pub fn render_checkout_email(snapshot: &CheckoutSnapshot) -> Result<RenderedEmail, CheckoutError> {
    let rows: Vec<EmailRow<'_>> = snapshot
        .items
        .iter()
        .map(|line| EmailRow {
            name: &line.product.name,
            quantity: line.quantity,
            unit_price: line.product.price.to_string(),
        })
        .collect();
    let discount = if snapshot.discount.is_positive() {
        snapshot.discount.to_string()
    } else {
        NO_DISCOUNT.to_owned()
    };
    let shipping_fee = snapshot.shipping_fee.to_string();
    let total = snapshot.total.to_string();

    let html = CheckoutEmailHtml {
        rows: &rows,
        discount: &discount,
        shipping_fee: &shipping_fee,
        total: &total,
    }
    .render()?;
    let text = CheckoutEmailText {
        rows: &rows,
        discount: &discount,
        shipping_fee: &shipping_fee,
        total: &total,
    }
    .render()?;

    Ok(RenderedEmail { html, text })
}

/// Sends checkout emails through a lettre transport.
pub struct CheckoutNotifier<T> {
    transport: T,
    from: Mailbox,
}

impl SmtpCheckoutNotifier {
    /// Create an SMTP notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Smtp` if the relay cannot be configured.
    /// Returns `CheckoutError::InvalidAddress` if the sender address is invalid.
    pub fn from_config(config: &EmailConfig) -> Result<Self, CheckoutError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self::new(transport, parse_mailbox(&config.from_address)?))
    }
}

impl<T> CheckoutNotifier<T>
where
    T: AsyncTransport + Send + Sync,
    T::Error: std::fmt::Display,
{
    /// Create a notifier sending from `from` over `transport`.
    #[must_use]
    pub const fn new(transport: T, from: Mailbox) -> Self {
        Self { transport, from }
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Verify, render, and send the checkout email to `recipient`.
    ///
    /// Nothing is sent when verification fails.
    ///
    /// # Errors
    ///
    /// Returns the verification errors of [`CheckoutSnapshot::verify`].
    /// Returns `CheckoutError::SendFailed` if the transport rejects the message.
    #[instrument(skip(self, snapshot), fields(to = %recipient, items = snapshot.items.len()))]
    pub async fn send_checkout_email(
        &self,
        recipient: &Email,
        snapshot: &CheckoutSnapshot,
    ) -> Result<(), CheckoutError> {
        snapshot.verify()?;
        let rendered = render_checkout_email(snapshot)?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(recipient.as_str())?)
            .subject(CHECKOUT_SUBJECT)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(rendered.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(rendered.html),
                    ),
            )?;

        if let Err(e) = self.transport.send(message).await {
            tracing::error!(error = %e, "Error sending checkout email");
            return Err(CheckoutError::SendFailed);
        }

        tracing::info!(total = %snapshot.total, "Checkout email sent");
        Ok(())
    }
}

/// Parse a bare address into a mailbox without a display name.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidAddress` if lettre rejects the address.
pub fn parse_mailbox(address: &str) -> Result<Mailbox, CheckoutError> {
    address
        .parse::<Address>()
        .map(|addr| Mailbox::new(None, addr))
        .map_err(|_| CheckoutError::InvalidAddress(address.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lettre::transport::stub::AsyncStubTransport;

    use super::*;

    fn line(name: &str, price: i64, quantity: i32) -> CheckoutLine {
        CheckoutLine {
            product: CheckoutProduct {
                name: name.to_owned(),
                price: Price::from_rupiah(price),
            },
            quantity,
        }
    }

    fn example_snapshot() -> CheckoutSnapshot {
        CheckoutSnapshot {
            items: vec![line("Kopi Gayo", 10_000, 2), line("Teh Melati", 5_000, 1)],
            discount: Price::ZERO,
            shipping_fee: Price::from_rupiah(2_000),
            total: Price::from_rupiah(27_000),
        }
    }

    fn notifier(transport: AsyncStubTransport) -> CheckoutNotifier<AsyncStubTransport> {
        CheckoutNotifier::new(transport, parse_mailbox("toko@example.com").unwrap())
    }

    fn shopper() -> Email {
        Email::parse("budi@example.com").unwrap()
    }

    #[test]
    fn test_verify_accepts_consistent_total() {
        let snapshot = example_snapshot();
        assert_eq!(snapshot.expected_total(), Some(Price::from_rupiah(27_000)));
        assert!(snapshot.verify().is_ok());
    }

    #[test]
    fn test_verify_rejects_mismatch() {
        let mut snapshot = example_snapshot();
        snapshot.total = Price::from_rupiah(26_000);
        assert!(matches!(
            snapshot.verify(),
            Err(CheckoutError::TotalMismatch { expected, supplied })
                if expected == Price::from_rupiah(27_000) && supplied == Price::from_rupiah(26_000)
        ));
    }

    #[test]
    fn test_verify_rejects_empty_and_negative() {
        let mut empty = example_snapshot();
        empty.items.clear();
        assert!(matches!(empty.verify(), Err(CheckoutError::EmptyCart)));

        let mut negative = example_snapshot();
        negative.discount = Price::from_rupiah(-1_000);
        negative.total = Price::from_rupiah(28_000);
        assert!(matches!(
            negative.verify(),
            Err(CheckoutError::NegativeAmount("discount"))
        ));
    }

    #[test]
    fn test_verify_rejects_amounts_that_overflow() {
        let body = r#"{"discount":"0","shipping_fee":"79228162514264337593543950335","total":"1"}"#;
        let figures: serde_json::Value = serde_json::from_str(body).unwrap();
        let amount = |key: &str| -> Price { serde_json::from_value(figures[key].clone()).unwrap() };

        let mut snapshot = example_snapshot();
        snapshot.discount = amount("discount");
        snapshot.shipping_fee = amount("shipping_fee");
        snapshot.total = amount("total");

        assert_eq!(snapshot.expected_total(), None);
        assert!(matches!(
            snapshot.verify(),
            Err(CheckoutError::AmountOutOfRange)
        ));
    }

    #[test]
    fn test_verify_rejects_line_total_overflow() {
        let mut snapshot = example_snapshot();
        snapshot.items[0].product.price = Price::new(rust_decimal::Decimal::MAX);
        assert!(matches!(
            snapshot.verify(),
            Err(CheckoutError::AmountOutOfRange)
        ));
    }

    #[test]
    fn test_render_shows_rows_and_no_discount() {
        let rendered = render_checkout_email(&example_snapshot()).unwrap();

        assert_eq!(rendered.html.matches("<tr class=\"item\">").count(), 2);
        assert!(rendered.html.contains("Kopi Gayo"));
        assert!(rendered.html.contains("Rp 10.000"));
        assert!(rendered.html.contains("Diskon: Tidak ada"));
        assert!(rendered.html.contains("Biaya Pengiriman: Rp 2.000"));
        assert!(rendered.html.contains("Total: Rp 27.000"));

        assert!(rendered.text.contains("- Kopi Gayo x2 @ Rp 10.000"));
        assert!(rendered.text.contains("- Teh Melati x1 @ Rp 5.000"));
        assert!(rendered.text.contains("Diskon: Tidak ada"));
    }

    #[test]
    fn test_render_shows_discount_amount() {
        let mut snapshot = example_snapshot();
        snapshot.discount = Price::from_rupiah(5_000);
        snapshot.total = Price::from_rupiah(22_000);

        let rendered = render_checkout_email(&snapshot).unwrap();
        assert!(rendered.html.contains("Diskon: Rp 5.000"));
        assert!(!rendered.html.contains("Tidak ada"));
    }

    #[test]
    fn test_render_escapes_product_names_in_html() {
        let mut snapshot = example_snapshot();
        snapshot.items[0].product.name = "<b>Kopi</b>".to_owned();

        let rendered = render_checkout_email(&snapshot).unwrap();
        let escaped = askama::filters::escape("<b>Kopi</b>", askama::filters::Html)
            .unwrap()
            .to_string();
        assert!(!rendered.html.contains("<b>Kopi</b>"));
        assert!(rendered.html.contains(&escaped));
        assert!(rendered.html.contains("&#60;b&#62;Kopi&#60;/b&#62;"));
    }

    #[tokio::test]
    async fn test_send_delivers_one_message() {
        let notifier = notifier(AsyncStubTransport::new_ok());
        notifier
            .send_checkout_email(&shopper(), &example_snapshot())
            .await
            .unwrap();

        let messages = notifier.transport().messages().await;
        assert_eq!(messages.len(), 1);
        let (envelope, raw) = &messages[0];
        assert_eq!(envelope.to()[0].to_string(), "budi@example.com");
        assert!(raw.contains("Subject: Checkout Sedang Diproses"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn test_send_refuses_mismatched_total() {
        let notifier = notifier(AsyncStubTransport::new_ok());
        let mut snapshot = example_snapshot();
        snapshot.total = Price::from_rupiah(1);

        let result = notifier.send_checkout_email(&shopper(), &snapshot).await;
        assert!(matches!(result, Err(CheckoutError::TotalMismatch { .. })));
        assert!(notifier.transport().messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_send_failed() {
        let notifier = notifier(AsyncStubTransport::new_error());
        let result = notifier
            .send_checkout_email(&shopper(), &example_snapshot())
            .await;
        assert!(matches!(result, Err(CheckoutError::SendFailed)));
        assert_eq!(result.unwrap_err().to_string(), "failed to send email");
    }
}
