use bytes::{Buf, BufMut, Bytes, BytesMut};
use flate2::read::{GzDecoder, ZlibDecoder};
use hyper::body::HttpBody;
use io::Read;

#[allow(unused_imports)]
use crate::_prelude::*;
use crate::{config, types::*};

pub(crate) type HttpClient = hyper::Client<HttpConnector>;
pub(crate) type HttpConnector = hyper_tls::HttpsConnector<hyper::client::HttpConnector>;

const REDIRECT_CODES: [u16; 5] = [301, 302, 303, 307, 308];

/// One GET per url, following redirects, bounded by `fetch_timeout` end to end.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Fetcher {
	#[derivative(Debug = "ignore")]
	client:   HttpClient,
	settings: Arc<config::CrawlingSettings>,
	headers:  HashMap<String, Vec<String>>,
}

impl Fetcher {
	pub fn new(networking_profile: &config::NetworkingProfile, settings: Arc<config::CrawlingSettings>) -> Self {
		let mut http = hyper::client::HttpConnector::new();
		http.set_connect_timeout(networking_profile.connect_timeout.as_ref().map(|v| **v));
		http.set_recv_buffer_size(networking_profile.socket_read_buffer_size.as_ref().map(|v| **v));
		http.set_send_buffer_size(networking_profile.socket_write_buffer_size.as_ref().map(|v| **v));
		http.enforce_http(false);

		let https = hyper_tls::HttpsConnector::new_with_connector(http);
		let client = hyper::Client::builder().build::<_, hyper::Body>(https);
		let headers = settings.as_ref().clone().build_headers().custom_headers;

		Self { client, settings, headers }
	}

	pub async fn fetch(&self, url: &str) -> Result<FetchData> {
		let limit = *self.settings.fetch_timeout;
		timeout(limit, self.fetch_following(url)).await.map_err(|_| Error::FetchTimeout(limit))?
	}

	async fn fetch_following(&self, url: &str) -> Result<FetchData> {
		let t = Instant::now();
		let requested = Url::parse(url).with_context(|| format!("cannot parse url {:?}", url))?;
		let mut url = requested.clone();
		let mut redirects = 0;

		loop {
			let scheme = url.scheme();
			if scheme != "http" && scheme != "https" {
				return Err(anyhow!("invalid scheme {:?} in {:?}", scheme, url.as_str()).into())
			}

			let mut resp = self.get(&url).await?;
			let code = resp.status().as_u16();

			if REDIRECT_CODES.contains(&code) {
				let location = resp
					.headers()
					.get(http::header::LOCATION)
					.ok_or_else(|| anyhow!("location: not found"))?
					.to_str()
					.context("cannot read location value")?;
				let next = url.join(location).with_context(|| format!("cannot join redirect {} to {}", location, url))?;

				redirects += 1;
				if redirects > self.settings.max_redirect {
					return Err(Error::TooManyRedirects(self.settings.max_redirect))
				}
				debug!(from = %url, to = %next, "following redirect");
				url = next;
				continue
			}

			if !(200..300).contains(&code) {
				return Err(Error::HttpStatus(code))
			}

			let content_type = header_str(&resp, http::header::CONTENT_TYPE);
			let encoding = header_str(&resp, http::header::CONTENT_ENCODING);
			let bytes = self.read(&mut resp, &encoding).await?;

			return Ok(FetchData {
				url: requested,
				effective_url: url,
				code,
				content_type,
				bytes,
				metrics: FetchMetrics { duration: t.elapsed(), redirects },
			})
		}
	}

	async fn get(&self, url: &Url) -> Result<hyper::Response<hyper::Body>> {
		let uri = hyper::Uri::from_str(url.as_str()).with_context(|| format!("cannot create http uri {}", url))?;

		let mut req = hyper::Request::builder().uri(uri).method(hyper::Method::GET);
		for (n, vs) in &self.headers {
			for v in vs {
				req = req.header(n, v);
			}
		}

		let req = req.body(hyper::Body::default()).context("could not construct http request")?;
		let resp = self.client.request(req).await.context("cannot make http get")?;
		Ok(resp)
	}

	async fn read(&self, resp: &mut hyper::Response<hyper::Body>, encoding: &str) -> Result<Bytes> {
		let max_response_size = *self.settings.max_response_size;
		let mut bytes = BytesMut::with_capacity(*self.settings.internal_read_buffer_size);

		while let Some(buf) = resp.body_mut().data().await {
			let buf = buf.context("error during reading")?;
			if buf.has_remaining() {
				if bytes.len() + buf.len() > max_response_size {
					return Err(Error::ResponseTooLarge(max_response_size))
				}
				bytes.put(buf);
			}
		}

		if encoding.contains("gzip") {
			return decode(GzDecoder::new(bytes.reader()), max_response_size, "gzip")
		}
		if encoding.contains("deflate") {
			return decode(ZlibDecoder::new(bytes.reader()), max_response_size, "deflate")
		}

		Ok(bytes.freeze())
	}
}

// the size cap applies to the decoded body as well
fn decode(decoder: impl Read, max_response_size: usize, name: &str) -> Result<Bytes> {
	let mut buf: Vec<u8> = vec![];
	let _ = decoder
		.take(max_response_size as u64 + 1)
		.read_to_end(&mut buf)
		.with_context(|| format!("cannot decode {} body", name))?;
	if buf.len() > max_response_size {
		return Err(Error::ResponseTooLarge(max_response_size))
	}
	Ok(Bytes::from(buf))
}

fn header_str(resp: &hyper::Response<hyper::Body>, name: http::header::HeaderName) -> String {
	resp.headers().get(name).and_then(|h| h.to_str().ok()).unwrap_or("").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use flate2::{write::GzEncoder, Compression};

	use super::*;

	fn gzip(data: &[u8]) -> Vec<u8> {
		let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
		encoder.write_all(data).unwrap();
		encoder.finish().unwrap()
	}

	#[test]
	fn decoded_body_respects_size_cap() {
		let body = gzip(&vec![b'a'; 100_000]);
		assert!(body.len() < 1_000);

		let r = decode(GzDecoder::new(&body[..]), 10_000, "gzip");
		assert!(matches!(r, Err(Error::ResponseTooLarge(10_000))));

		let r = decode(GzDecoder::new(&body[..]), 100_000, "gzip").unwrap();
		assert_eq!(r.len(), 100_000);
	}
}
