//! Controls which parts of a function call become visible in the chat.

use serde_json::Value;

use crate::invoker::Invocation;

/// A class of content a function call can expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentClass {
    /// The arguments the function was called with.
    Arguments,
    /// The value the function returned.
    ReturnValue,
    /// A one-line description of the call.
    Summary,
}

/// Which content classes are included in the visible reply.
///
/// The default includes only the return value. A configuration without
/// any class is rejected when the agent is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VisibilityConfig {
    arguments: bool,
    return_value: bool,
    summary: bool,
}

impl Default for VisibilityConfig {
    #[inline]
    fn default() -> Self {
        Self {
            arguments: false,
            return_value: true,
            summary: false,
        }
    }
}

impl VisibilityConfig {
    /// A configuration including nothing, to be built up with
    /// [`include`](Self::include).
    #[inline]
    pub fn none() -> Self {
        Self {
            arguments: false,
            return_value: false,
            summary: false,
        }
    }

    /// Includes a content class.
    #[inline]
    pub fn include(self, class: ContentClass) -> Self {
        self.set(class, true)
    }

    /// Excludes a content class.
    #[inline]
    pub fn exclude(self, class: ContentClass) -> Self {
        self.set(class, false)
    }

    /// Returns `true` if `class` is included.
    #[inline]
    pub fn includes(&self, class: ContentClass) -> bool {
        match class {
            ContentClass::Arguments => self.arguments,
            ContentClass::ReturnValue => self.return_value,
            ContentClass::Summary => self.summary,
        }
    }

    /// Returns `true` if no class is included.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.arguments || self.return_value || self.summary)
    }

    fn set(mut self, class: ContentClass, included: bool) -> Self {
        match class {
            ContentClass::Arguments => self.arguments = included,
            ContentClass::ReturnValue => self.return_value = included,
            ContentClass::Summary => self.summary = included,
        }
        self
    }

    /// Projects a successful call onto the included classes, one line per
    /// class, in the order arguments, return value, summary.
    ///
    /// The result is never blank: if the included classes render to
    /// nothing (say, an empty return value), the summary is used instead.
    pub fn redact(&self, invocation: &Invocation) -> String {
        let mut lines = Vec::with_capacity(3);
        if self.arguments {
            if invocation.arguments.is_empty() {
                lines.push("Arguments: (none)".to_owned());
            } else {
                lines.push(format!("Arguments: {}", invocation.arguments));
            }
        }
        if self.return_value {
            if let Ok(value) = &invocation.outcome {
                lines.push(native_text(value));
            }
        }
        if self.summary {
            lines.push(invocation.summary());
        }
        let content = lines.join("\n");
        if content.trim().is_empty() {
            return invocation.summary();
        }
        content
    }
}

/// Strings as they are, everything else as JSON.
fn native_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::function::{FunctionSpec, Param, ParamType};
    use crate::invoker::FunctionInvoker;
    use crate::{ArgumentResolver, ArgumentSource, PendingArguments};

    async fn invocation() -> Invocation {
        let spec = FunctionSpec::new("greet", |args| {
            Ok(json!(format!("hi {}", args.get_str("who").unwrap_or("?"))))
        })
        .with_param(Param::required("who", ParamType::String))
        .with_param(Param::with_default("times", ParamType::Integer, 1));
        let mut pending = PendingArguments::unresolved(&spec);
        pending.bind("who", json!("bob"));
        let arguments = ArgumentResolver::new(ArgumentSource::Defaults, Default::default(), 0)
            .resolve(&spec, &mut pending, &[])
            .await
            .unwrap();
        FunctionInvoker::default()
            .invoke(&spec, arguments)
            .invocation
            .unwrap()
    }

    #[tokio::test]
    async fn test_default_is_return_value_only() {
        let invocation = invocation().await;
        assert_eq!(VisibilityConfig::default().redact(&invocation), "hi bob");
    }

    #[tokio::test]
    async fn test_all_classes() {
        let invocation = invocation().await;
        let config = VisibilityConfig::default()
            .include(ContentClass::Arguments)
            .include(ContentClass::Summary);
        assert_eq!(
            config.redact(&invocation),
            "Arguments: who=\"bob\", times=1\nhi bob\n`greet` executed with 2 argument(s)"
        );

        let config = config.exclude(ContentClass::ReturnValue);
        assert!(!config.redact(&invocation).contains("hi bob"));
    }

    #[tokio::test]
    async fn test_blank_return_value() {
        let spec = FunctionSpec::new("blank", |_| Ok(json!("  ")));
        let invocation = FunctionInvoker::default()
            .invoke(&spec, Default::default())
            .invocation
            .unwrap();
        assert_eq!(
            VisibilityConfig::default().redact(&invocation),
            "`blank` executed with 0 argument(s)"
        );
    }

    #[test]
    fn test_empty() {
        assert!(VisibilityConfig::none().is_empty());
        assert!(!VisibilityConfig::default().is_empty());
        assert!(
            VisibilityConfig::default()
                .exclude(ContentClass::ReturnValue)
                .is_empty()
        );
        assert_eq!(native_text(&json!(1)), "1");
        assert_eq!(native_text(&json!("1")), "1");
    }
}
