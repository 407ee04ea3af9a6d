use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

const MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
}

impl TryFrom<&str> for Method {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, anyhow::Error> {
        match value {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            _ => Err(anyhow::anyhow!("Method not supported")),
        }
    }
}

#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Request {
    pub async fn read_from<R: AsyncRead + Unpin>(mut reader: R) -> Result<Self> {
        let mut raw = Vec::with_capacity(1024);
        let mut buffer = [0; 1024];
        loop {
            let size = reader.read(&mut buffer).await.context("Read Error")?;
            raw.extend_from_slice(&buffer[..size]);
            if size == 0 || body_complete(&raw)? {
                break;
            }
            if raw.len() > MAX_REQUEST_BYTES {
                anyhow::bail!("request too large");
            }
        }
        Self::parse(&String::from_utf8_lossy(&raw))
    }

    pub fn parse(request: &str) -> Result<Self> {
        let (head, body) = request.split_once("\r\n\r\n").unwrap_or((request, ""));

        // Method and path
        let mut head_line = head.lines();
        let first = head_line.next().context("Empty Request")?;
        let mut request_parts = first.split_whitespace();
        let method: Method = request_parts
            .next()
            .ok_or(anyhow::anyhow!("missing method"))
            .and_then(TryInto::try_into)
            .context("Missing Method")?;
        let path = request_parts.next().context("No Path")?;

        // Headers
        let mut headers = HashMap::new();
        for line in head_line {
            if let Some((k, v)) = line.split_once(':') {
                headers.insert(k.trim().to_lowercase(), v.trim().to_string());
            }
        }
        Ok(Request {
            method,
            path: path.split('?').next().unwrap_or(path).to_string(),
            headers,
            body: body.to_string(),
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

fn body_complete(raw: &[u8]) -> Result<bool> {
    let Some(head_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
        return Ok(false);
    };
    let head = String::from_utf8_lossy(&raw[..head_end]);
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .map(|(_, v)| v.trim().parse::<usize>().context("Invalid Content-Length"))
        .transpose()?
        .unwrap_or(0);
    if content_length > MAX_REQUEST_BYTES {
        anyhow::bail!("Content-Length {} over limit", content_length);
    }
    let expected = (head_end + 4)
        .checked_add(content_length)
        .context("Content-Length overflow")?;
    Ok(raw.len() >= expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_head_headers_and_body() {
        let raw = "POST /accounts/select?x=1 HTTP/1.1\r\nAuthorization: Bearer t\r\nX-Session-Id: s1\r\n\r\n{\"accountId\":\"acc-1\"}";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/accounts/select");
        assert_eq!(request.header("x-session-id"), Some("s1"));
        assert_eq!(request.body, "{\"accountId\":\"acc-1\"}");
    }

    #[test]
    fn rejects_unknown_method() {
        assert!(Request::parse("DELETE /logout HTTP/1.1\r\n\r\n").is_err());
    }

    #[tokio::test]
    async fn reads_until_content_length() {
        let raw = b"POST /logout HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}";
        let request = Request::read_from(&raw[..]).await.unwrap();
        assert_eq!(request.path, "/logout");
        assert_eq!(request.body, "{}");
    }

    #[tokio::test]
    async fn oversized_content_length_is_rejected() {
        let raw = b"POST /logout HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\n{}";
        let err = Request::read_from(&raw[..]).await.unwrap_err();
        assert!(err.to_string().contains("over limit"));

        let raw = b"POST /logout HTTP/1.1\r\nContent-Length: 70000\r\n\r\n";
        assert!(Request::read_from(&raw[..]).await.is_err());
    }

    #[tokio::test]
    async fn non_numeric_content_length_is_rejected() {
        let raw = b"POST /logout HTTP/1.1\r\nContent-Length: lots\r\n\r\n";
        assert!(Request::read_from(&raw[..]).await.is_err());
    }
}
