//! Turns fetched bytes into plain text. PDF payloads go through `pdf-extract`,
//! everything else is parsed as HTML and reduced to its DOM text content.

use std::panic;

use select::{document::Document, predicate::Text};

#[allow(unused_imports)]
use crate::_prelude::*;
use crate::types::*;

const INVISIBLE: [&str; 3] = ["script", "style", "noscript"];

/// PDF when the content type mentions "pdf" or any of `urls` (requested and effective) has a path
/// ending in `.pdf`, HTML otherwise.
pub fn classify(content_type: &str, urls: &[&Url]) -> ResourceKind {
	let pdf_path = urls.iter().any(|u| u.path().to_ascii_lowercase().ends_with(".pdf"));
	if pdf_path || content_type.to_ascii_lowercase().contains("pdf") {
		ResourceKind::Pdf
	} else {
		ResourceKind::Html
	}
}

pub fn extract(bytes: &[u8], content_type: &str, urls: &[&Url]) -> Result<Extracted> {
	let kind = classify(content_type, urls);
	let text = match kind {
		ResourceKind::Pdf => extract_pdf(bytes)?,
		_ => extract_html(bytes),
	};
	trace!(kind = %kind, chars = text.len(), "extracted");
	Ok(Extracted { text, kind })
}

/// Image-only documents yield an empty string. Structural damage is an error.
pub fn extract_pdf(bytes: &[u8]) -> Result<String> {
	let r = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));
	match r {
		Ok(Ok(text)) => Ok(text),
		Ok(Err(err)) => Err(Error::Pdf(err.to_string())),
		Err(payload) => Err(Error::Pdf(panic_message(payload.as_ref()))),
	}
}

pub fn extract_html(bytes: &[u8]) -> String {
	let html = String::from_utf8_lossy(bytes);
	let document = Document::from(html.as_ref());

	document
		.find(Text)
		.filter(|node| {
			let parent = node.parent().and_then(|p| p.name().map(str::to_ascii_lowercase));
			!matches!(parent, Some(name) if INVISIBLE.contains(&name.as_str()))
		})
		.filter_map(|node| node.as_text().map(String::from))
		.collect()
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		String::from(*s)
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		String::from("unknown panic")
	}
}
