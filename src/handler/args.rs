//! Resolved handler arguments.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::HttpError;
use crate::metadata::{ParamSource, ParameterMetadata};
use crate::middleware::{RequestContext, ResponseSlot};
use crate::server::Error;

/// The value bound to one argument position.
#[derive(Debug, Clone)]
pub enum ArgValue {
    /// A single named path capture, query parameter or header.
    Text(Option<String>),
    /// All path captures, query parameters or headers.
    Map(HashMap<String, String>),
    /// The decoded body or one of its fields.
    Json(Option<Value>),
    Request(Arc<RequestContext>),
    Response(ResponseSlot),
}

#[derive(Debug, Clone)]
pub struct Arg {
    pub binding: ParameterMetadata,
    pub value: ArgValue,
}

/// A handler's arguments, in declared order.
#[derive(Debug, Clone, Default)]
pub struct Args {
    args: Vec<Arg>,
}

impl Args {
    /// Resolves each binding against the request. `bindings` must be sorted by index.
    pub fn resolve(bindings: &[ParameterMetadata], ctx: RequestContext) -> Self {
        let mut snapshot: Option<Arc<RequestContext>> = None;
        let request = &ctx.request;

        let args = bindings
            .iter()
            .map(|binding| {
                let name = binding.name.as_deref();
                let value = match (binding.source, name) {
                    (ParamSource::Path, Some(name)) => ArgValue::Text(request.get_path_param(name).cloned()),
                    (ParamSource::Path, None) => ArgValue::Map(request.path_params.clone()),
                    (ParamSource::Query, Some(name)) => ArgValue::Text(request.get_query_param(name).cloned()),
                    (ParamSource::Query, None) => ArgValue::Map(request.query_params.clone()),
                    (ParamSource::Header, Some(name)) => ArgValue::Text(request.get_header(name).cloned()),
                    (ParamSource::Header, None) => ArgValue::Map(request.headers.clone()),
                    (ParamSource::Body, None) => ArgValue::Json(ctx.body.clone()),
                    (ParamSource::Body, Some(field)) => {
                        ArgValue::Json(ctx.body.as_ref().and_then(|body| body.get(field)).cloned())
                    }
                    (ParamSource::Request, _) => {
                        let shared = snapshot.get_or_insert_with(|| Arc::new(ctx.clone()));
                        ArgValue::Request(shared.clone())
                    }
                    (ParamSource::Response, _) => ArgValue::Response(ctx.response.clone()),
                };
                Arg {
                    binding: binding.clone(),
                    value,
                }
            })
            .collect();

        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.args.iter()
    }

    fn arg(&self, index: usize) -> Result<&Arg, Error> {
        self.args.get(index).ok_or_else(|| {
            Error::Argument(format!("argument {index} is not bound (handler has {})", self.args.len()))
        })
    }

    fn mismatch(arg: &Arg, wanted: &str) -> Error {
        Error::Argument(format!(
            "argument {} is bound to {}, which cannot be read as {wanted}",
            arg.binding.index,
            arg.binding.describe()
        ))
    }

    /// A single text value, `None` when the request does not carry it.
    ///
    /// Body fields holding a number or a boolean read as their JSON text and
    /// `null` reads as absent. Objects and arrays are a 400.
    pub fn text(&self, index: usize) -> Result<Option<Cow<'_, str>>, Error> {
        let arg = self.arg(index)?;
        match &arg.value {
            ArgValue::Text(value) => Ok(value.as_deref().map(Cow::Borrowed)),
            ArgValue::Json(None | Some(Value::Null)) => Ok(None),
            ArgValue::Json(Some(Value::String(value))) => Ok(Some(Cow::Borrowed(value))),
            ArgValue::Json(Some(value @ (Value::Number(_) | Value::Bool(_)))) => {
                Ok(Some(Cow::Owned(value.to_string())))
            }
            ArgValue::Json(Some(_)) => Err(HttpError::bad_request()
                .with_message(format!("Invalid {}: expected a single value", arg.binding.describe()))
                .into()),
            _ => Err(Self::mismatch(arg, "text")),
        }
    }

    /// A text value that must be present; missing values are a 400.
    pub fn require(&self, index: usize) -> Result<Cow<'_, str>, Error> {
        match self.text(index)? {
            Some(value) => Ok(value),
            None => {
                let arg = self.arg(index)?;
                Err(HttpError::bad_request()
                    .with_message(format!("Missing required {}", arg.binding.describe()))
                    .into())
            }
        }
    }

    /// Parses a required text value; unparsable values are a 400.
    pub fn parse<T>(&self, index: usize) -> Result<T, Error>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.require(index)?;
        self.parse_raw(index, &raw)
    }

    /// Parses an optional text value.
    pub fn parse_opt<T>(&self, index: usize) -> Result<Option<T>, Error>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.text(index)? {
            Some(raw) => self.parse_raw(index, &raw).map(Some),
            None => Ok(None),
        }
    }

    fn parse_raw<T>(&self, index: usize, raw: &str) -> Result<T, Error>
    where
        T: FromStr,
        T::Err: Display,
    {
        raw.parse::<T>().map_err(|e| {
            let described = self
                .args
                .get(index)
                .map(|arg| arg.binding.describe())
                .unwrap_or_default();
            HttpError::bad_request()
                .with_message(format!("Invalid {described}: {e}"))
                .into()
        })
    }

    /// The raw JSON value of a body binding, `None` when absent.
    pub fn value(&self, index: usize) -> Result<Option<&Value>, Error> {
        let arg = self.arg(index)?;
        match &arg.value {
            ArgValue::Json(value) => Ok(value.as_ref()),
            _ => Err(Self::mismatch(arg, "a JSON value")),
        }
    }

    /// Deserializes an argument; absent or mismatching data is a 400.
    ///
    /// Body bindings deserialize their JSON, map bindings deserialize from an
    /// object of strings and text bindings from a JSON string.
    pub fn json<T: DeserializeOwned>(&self, index: usize) -> Result<T, Error> {
        let arg = self.arg(index)?;
        let value = match &arg.value {
            ArgValue::Json(Some(value)) => value.clone(),
            ArgValue::Text(Some(text)) => Value::String(text.clone()),
            ArgValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<Map<String, Value>>(),
            ),
            ArgValue::Json(None) | ArgValue::Text(None) => {
                return Err(HttpError::bad_request()
                    .with_message(format!("Missing required {}", arg.binding.describe()))
                    .into());
            }
            _ => return Err(Self::mismatch(arg, "JSON")),
        };
        serde_json::from_value(value).map_err(|e| {
            HttpError::bad_request()
                .with_message(format!("Invalid {}: {e}", arg.binding.describe()))
                .with_source(e)
                .into()
        })
    }

    /// All path captures, query parameters or headers.
    pub fn map(&self, index: usize) -> Result<&HashMap<String, String>, Error> {
        let arg = self.arg(index)?;
        match &arg.value {
            ArgValue::Map(map) => Ok(map),
            _ => Err(Self::mismatch(arg, "a map")),
        }
    }

    pub fn request(&self, index: usize) -> Result<&RequestContext, Error> {
        let arg = self.arg(index)?;
        match &arg.value {
            ArgValue::Request(ctx) => Ok(ctx),
            _ => Err(Self::mismatch(arg, "the request")),
        }
    }

    pub fn response(&self, index: usize) -> Result<&ResponseSlot, Error> {
        let arg = self.arg(index)?;
        match &arg.value {
            ArgValue::Response(slot) => Ok(slot),
            _ => Err(Self::mismatch(arg, "the response")),
        }
    }
}
