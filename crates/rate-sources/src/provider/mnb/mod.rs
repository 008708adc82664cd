//! Magyar Nemzeti Bank (MNB) rate source.
//!
//! MNB publishes official HUF rates through a SOAP 1.1 web service. Two
//! operations are used:
//! - `GetCurrentExchangeRates` for the latest published day
//! - `GetExchangeRates(startDate, endDate, currencyNames)` for a date range
//!
//! Both return an XML document as an escaped string inside the SOAP result
//! element:
//!
//! ```text
//! <MNBExchangeRates>
//!   <Day date="2024-03-01">
//!     <Rate unit="1" curr="EUR">392,81</Rate>
//!     <Rate unit="100" curr="JPY">241,56</Rate>
//!   </Day>
//! </MNBExchangeRates>
//! ```
//!
//! Rates use a comma decimal separator; `unit` is the quote unit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use log::{debug, info};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use crate::archive::{archive_payload, PayloadArchive};
use crate::errors::SourceError;
use crate::models::{FetchWindow, NormalizedRate, RateRequest, SourceModuleDefinition};
use crate::provider::{parse_decimal, RateSource};

/// Source code of the MNB adapter
pub const MNB_CODE: &str = "MNB";

/// Public MNB SOAP endpoint
pub const DEFAULT_MNB_URL: &str = "http://www.mnb.hu/arfolyamok.asmx";

const SOAP_NAMESPACE: &str = "http://www.mnb.hu/webservices/";
const SOAP_ACTION_PREFIX: &str = "http://www.mnb.hu/webservices/MNBArfolyamServiceSoap/";

const CURRENT_OPERATION: &str = "GetCurrentExchangeRates";
const RANGE_OPERATION: &str = "GetExchangeRates";

/// MNB SOAP rate source.
pub struct MnbSource {
    client: Client,
    endpoint: String,
    archive: Arc<dyn PayloadArchive>,
    module: SourceModuleDefinition,
}

impl MnbSource {
    /// Create an MNB source calling `endpoint` with the given request timeout.
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        archive: Arc<dyn PayloadArchive>,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::from_transport(MNB_CODE, e))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            archive,
            module: SourceModuleDefinition::new(MNB_CODE, "Magyar Nemzeti Bank", "HUF"),
        })
    }

    async fn call(&self, operation: &str, envelope: String) -> Result<String, SourceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}{}\"", SOAP_ACTION_PREFIX, operation))
            .body(envelope)
            .send()
            .await
            .map_err(|e| SourceError::from_transport(MNB_CODE, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::from_transport(MNB_CODE, e))?;

        if !status.is_success() {
            // Faults arrive as HTTP 500 with a SOAP body
            return match extract_result(&body, operation) {
                Err(fault @ SourceError::Unavailable { .. }) => Err(fault),
                _ => Err(SourceError::Unavailable {
                    provider: MNB_CODE.to_string(),
                    message: format!("HTTP status {}", status),
                }),
            };
        }

        Ok(body)
    }
}

#[async_trait]
impl RateSource for MnbSource {
    fn module(&self) -> &SourceModuleDefinition {
        &self.module
    }

    async fn fetch_rates(
        &self,
        request: &RateRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<NormalizedRate>, SourceError> {
        let (operation, envelope) = build_envelope(request);
        debug!("Calling MNB {} for {:?}", operation, request.window);

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(SourceError::Cancelled {
                    provider: MNB_CODE.to_string(),
                });
            }
            result = self.call(operation, envelope) => result?,
        };

        let document = extract_result(&body, operation)?;
        archive_payload(&self.archive, MNB_CODE, "xml", document.clone()).await;

        let rates = parse_rates(&document, Local::now().date_naive())?;
        info!("Fetched {} rates from MNB via {}", rates.len(), operation);
        Ok(rates)
    }
}

/// Build the SOAP operation name and envelope for a request.
fn build_envelope(request: &RateRequest) -> (&'static str, String) {
    match request.window {
        FetchWindow::Latest => (
            CURRENT_OPERATION,
            soap_envelope("<web:GetCurrentExchangeRates/>"),
        ),
        FetchWindow::Range { start, end } => {
            let mut body = String::from("<web:GetExchangeRates>");
            body.push_str(&format!(
                "<web:startDate>{}</web:startDate>",
                start.format("%Y-%m-%d")
            ));
            body.push_str(&format!(
                "<web:endDate>{}</web:endDate>",
                end.format("%Y-%m-%d")
            ));
            if !request.currencies.is_empty() {
                body.push_str(&format!(
                    "<web:currencyNames>{}</web:currencyNames>",
                    quick_xml::escape::escape(&request.currencies.join(","))
                ));
            }
            body.push_str("</web:GetExchangeRates>");
            (RANGE_OPERATION, soap_envelope(&body))
        }
    }
}

fn soap_envelope(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:web="{}">"#,
            "<soap:Body>{}</soap:Body></soap:Envelope>"
        ),
        SOAP_NAMESPACE, body
    )
}

fn xml_error(err: impl std::fmt::Display) -> SourceError {
    SourceError::malformed(MNB_CODE, err.to_string())
}

/// Pull the escaped rates document out of the `<{operation}Result>` element.
///
/// A SOAP fault is reported as [`SourceError::Unavailable`].
fn extract_result(envelope: &str, operation: &str) -> Result<String, SourceError> {
    let result_tag = format!("{}Result", operation);
    let mut reader = Reader::from_str(envelope);
    reader.config_mut().trim_text(true);

    let mut found = false;
    let mut in_result = false;
    let mut in_fault = false;
    let mut payload = String::new();
    let mut fault = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if name.as_ref() == result_tag.as_bytes() {
                    found = true;
                    in_result = true;
                } else if name.as_ref() == b"faultstring" {
                    in_fault = true;
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == result_tag.as_bytes() {
                    found = true;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == result_tag.as_bytes() {
                    in_result = false;
                } else if name.as_ref() == b"faultstring" {
                    in_fault = false;
                }
            }
            Ok(Event::Text(t)) if in_result || in_fault => {
                let text = t.unescape().map_err(xml_error)?;
                if in_result {
                    payload.push_str(&text);
                } else {
                    fault.push_str(&text);
                }
            }
            Ok(Event::CData(c)) if in_result => {
                payload.push_str(&String::from_utf8_lossy(&c));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    if !fault.is_empty() {
        return Err(SourceError::Unavailable {
            provider: MNB_CODE.to_string(),
            message: format!("SOAP fault: {}", fault),
        });
    }

    if !found {
        return Err(SourceError::malformed(
            MNB_CODE,
            format!("response does not contain {}", result_tag),
        ));
    }

    Ok(payload)
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, SourceError> {
    for attr in element.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.local_name().as_ref() == name {
            let value = attr.unescape_value().map_err(xml_error)?;
            return Ok(Some(value.trim().to_string()));
        }
    }
    Ok(None)
}

fn parse_day(element: &BytesStart<'_>, today: NaiveDate) -> Result<NaiveDate, SourceError> {
    match attribute(element, b"date")? {
        Some(raw) if !raw.is_empty() => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|_| SourceError::malformed(MNB_CODE, format!("invalid day '{}'", raw))),
        _ => Ok(today),
    }
}

fn parse_rate_attributes(element: &BytesStart<'_>) -> Result<(String, Decimal), SourceError> {
    let currency = attribute(element, b"curr")?
        .filter(|c| !c.is_empty())
        .ok_or_else(|| SourceError::malformed(MNB_CODE, "rate without currency"))?;

    let unit = match attribute(element, b"unit")? {
        Some(raw) if !raw.is_empty() => parse_decimal(&raw).ok_or_else(|| {
            SourceError::malformed(MNB_CODE, format!("invalid unit '{}' for {}", raw, currency))
        })?,
        _ => Decimal::ONE,
    };

    Ok((currency, unit))
}

/// Parse the rates document. `today` is used for days without a date.
fn parse_rates(document: &str, today: NaiveDate) -> Result<Vec<NormalizedRate>, SourceError> {
    if document.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut rates = Vec::new();
    let mut day = today;
    let mut pending: Option<(String, Decimal)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Day" => day = parse_day(&e, today)?,
                b"Rate" => {
                    pending = Some(parse_rate_attributes(&e)?);
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if pending.is_some() => {
                text.push_str(&t.unescape().map_err(xml_error)?);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Rate" => {
                if let Some((currency, unit)) = pending.take() {
                    let rate = parse_decimal(&text).ok_or_else(|| {
                        SourceError::malformed(
                            MNB_CODE,
                            format!("invalid rate '{}' for {}", text, currency),
                        )
                    })?;
                    rates.push(NormalizedRate::new(day, MNB_CODE, &currency, rate, unit));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(rates)
}
