//! Email bodies for receipts, SOW delivery and MSA review.

use crate::escape_html;
use covenant_core::Tier;

/// Subject and HTML body of an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailBody {
    pub subject: String,
    pub html: String,
}

/// Values shown on a payment receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptDetails {
    pub client_name: String,
    pub product: String,
    pub amount: String,
    pub currency: String,
    pub date: String,
    pub brand: String,
}

fn layout(brand: &str, inner: &str) -> String {
    format!(
        concat!(
            "<div style=\"font-family:Arial,sans-serif;max-width:600px;margin:0 auto;\">",
            "<h2 style=\"border-bottom:1px solid #ddd;padding-bottom:8px;\">{brand}</h2>",
            "{inner}",
            "<p style=\"color:#888;font-size:12px;margin-top:32px;\">{brand}</p>",
            "</div>"
        ),
        brand = escape_html(brand),
        inner = inner,
    )
}

/// Payment receipt. Copy is in Spanish.
pub fn receipt_email(details: &ReceiptDetails) -> EmailBody {
    let inner = format!(
        concat!(
            "<p>Hola {client},</p>",
            "<p>Hemos recibido tu pago. Gracias por confiar en nosotros.</p>",
            "<table style=\"width:100%;border-collapse:collapse;\">",
            "<tr><td><strong>Producto</strong></td><td>{product}</td></tr>",
            "<tr><td><strong>Monto</strong></td><td>{amount} {currency}</td></tr>",
            "<tr><td><strong>Fecha</strong></td><td>{date}</td></tr>",
            "</table>",
            "<p>Conserva este correo como comprobante de pago.</p>"
        ),
        client = escape_html(&details.client_name),
        product = escape_html(&details.product),
        amount = escape_html(&details.amount),
        currency = escape_html(&details.currency),
        date = escape_html(&details.date),
    );

    EmailBody {
        subject: format!("Recibo de Pago: {} - {}", details.product, details.brand),
        html: layout(&details.brand, &inner),
    }
}

/// SOW delivery with the document inline and a pay-and-accept link.
pub fn sow_email(
    client_name: &str,
    tier: Tier,
    sow_html: &str,
    pay_url: &str,
    brand: &str,
) -> EmailBody {
    let inner = format!(
        concat!(
            "<p>Hi {client},</p>",
            "<p>Your Statement of Work for {label} is ready. Review it below.</p>",
            "<div style=\"border:1px solid #eee;padding:16px;\">{sow}</div>",
            "<p style=\"text-align:center;margin:24px 0;\">",
            "<a href=\"{url}\" style=\"background:#111;color:#fff;padding:12px 24px;text-decoration:none;\">",
            "Pay &amp; Accept</a></p>",
            "<p>Paying this invoice accepts the SOW above.</p>"
        ),
        client = escape_html(client_name),
        label = tier.label(),
        sow = sow_html,
        url = escape_html(pay_url),
    );

    EmailBody {
        subject: format!("Statement of Work ({}) - {}", tier.label(), brand),
        html: layout(brand, &inner),
    }
}

/// MSA review request.
pub fn msa_email(client_name: &str, review_url: &str, brand: &str) -> EmailBody {
    let inner = format!(
        concat!(
            "<p>Hi {client},</p>",
            "<p>Before any Statement of Work can be executed we need your acceptance ",
            "of our Master Service Agreement.</p>",
            "<p style=\"text-align:center;margin:24px 0;\">",
            "<a href=\"{url}\" style=\"background:#111;color:#fff;padding:12px 24px;text-decoration:none;\">",
            "Review &amp; Sign MSA</a></p>"
        ),
        client = escape_html(client_name),
        url = escape_html(review_url),
    );

    EmailBody {
        subject: format!("Master Service Agreement - {}", brand),
        html: layout(brand, &inner),
    }
}
