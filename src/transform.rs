use swc_core::{
    common::{sync::Lrc, SourceMapper, Span, SyntaxContext, DUMMY_SP},
    ecma::{
        ast::*,
        visit::{noop_visit_mut_type, VisitMut, VisitMutWith},
    },
};

use crate::config::{BemedConfig, NameContext, CSS_IMPORT, FACTORY_IMPORT, FACTORY_MODULE};
use crate::error::TransformError;
use crate::session::{placeholder_index, placeholder_token, BuildSession};
use crate::source_map::{inline_source_map_comment, SourcePosition};

// -----------------------------------------------------------------------------
// Recognized shapes
// -----------------------------------------------------------------------------

/// Every node the transform cares about is classified into one of these;
/// anything else is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallShape {
    /// `const X = bemed({ name: "Literal", ... })`
    NamedFactoryCall { name: String },
    /// `const X = bemed()` or `const X = bemed({ ... })` without a literal name.
    BareFactoryCall { variable: String, arg: FactoryArg },
    /// css`...` using the tracked css import.
    TaggedCssTemplate,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FactoryArg {
    Missing,
    Object,
}

fn str_lit(value: impl Into<String>) -> Box<Expr> {
    let value: String = value.into();
    Box::new(Expr::Lit(Lit::Str(Str {
        span: DUMMY_SP,
        value: value.into(),
        raw: None,
    })))
}

fn arg(expr: Box<Expr>) -> ExprOrSpread {
    ExprOrSpread { spread: None, expr }
}

fn name_prop(name: &str) -> PropOrSpread {
    PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
        key: PropName::Ident(IdentName::new("name".into(), DUMMY_SP)),
        value: str_lit(name),
    })))
}

fn imported_name(named: &ImportNamedSpecifier) -> String {
    match &named.imported {
        Some(ModuleExportName::Ident(i)) => i.sym.to_string(),
        Some(ModuleExportName::Str(s)) => s.value.to_string(),
        None => named.local.sym.to_string(),
    }
}

/// Literal `name: "..."` property of an object argument, if any.
fn literal_name(obj: &ObjectLit) -> Option<String> {
    obj.props.iter().find_map(|p| match p {
        PropOrSpread::Prop(prop) => match &**prop {
            Prop::KeyValue(KeyValueProp {
                key: PropName::Ident(key),
                value,
            }) if key.sym.as_ref() == "name" => match &**value {
                Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
                _ => None,
            },
            _ => None,
        },
        PropOrSpread::Spread(_) => None,
    })
}

/// Literal text of a template interleaved with positional markers:
/// `color: ${c};` becomes `["color: ", "__BEMED_VAR_0__", ";"]`.
pub fn template_tokens(tpl: &Tpl) -> Vec<String> {
    let last = tpl.quasis.len().saturating_sub(1);
    tpl.quasis
        .iter()
        .enumerate()
        .flat_map(|(index, quasi)| {
            let text = quasi.raw.to_string();
            if index == last {
                vec![text]
            } else {
                vec![text, placeholder_token(index)]
            }
        })
        .collect()
}

// -----------------------------------------------------------------------------
// Transform state
// -----------------------------------------------------------------------------

pub struct BemedTransform<'a> {
    config: &'a BemedConfig,
    session: &'a mut BuildSession,
    filename: Option<String>,
    source_map: Option<Lrc<dyn SourceMapper>>,

    // Local aliases of the tracked imports, reset for every file.
    css_import: Option<Ident>,
    factory_import: Option<Ident>,

    error: Option<(TransformError, Span)>,
}

impl<'a> BemedTransform<'a> {
    pub fn new(
        config: &'a BemedConfig,
        session: &'a mut BuildSession,
        filename: Option<String>,
        source_map: Option<Lrc<dyn SourceMapper>>,
    ) -> Self {
        Self {
            config,
            session,
            filename,
            source_map,
            css_import: None,
            factory_import: None,
            error: None,
        }
    }

    /// First error hit during the walk together with the span it points at.
    pub fn take_error(&mut self) -> Option<(TransformError, Span)> {
        self.error.take()
    }

    pub fn into_result(self) -> Result<(), TransformError> {
        match self.error {
            Some((err, _)) => Err(err),
            None => Ok(()),
        }
    }

    // ---------- per file ----------

    fn enter_file(&mut self) {
        self.css_import = None;
        self.factory_import = None;
    }

    fn exit_file(&mut self) {
        if self.error.is_some() {
            return;
        }
        if let Some(file) = &self.filename {
            self.session.mark_file_seen(file);
        }
    }

    // ---------- helpers ----------

    fn line_of(&self, span: Span) -> usize {
        if span.is_dummy() {
            return 0;
        }
        match &self.source_map {
            Some(cm) => cm.lookup_char_pos(span.lo()).line,
            None => 0,
        }
    }

    fn source_map_comment(&self, span: Span) -> String {
        if span.is_dummy() {
            return String::new();
        }
        let Some(cm) = &self.source_map else {
            return String::new();
        };
        let loc = cm.lookup_char_pos(span.lo());
        let name = self
            .filename
            .clone()
            .unwrap_or_else(|| loc.file.name.to_string());
        let content = (*loc.file.src).to_owned();
        inline_source_map_comment(
            &name,
            (!content.is_empty()).then_some(content.as_str()),
            SourcePosition {
                line: loc.line,
                column: loc.col.0,
            },
        )
    }

    fn assert_unique_name(&mut self, name: &str, span: Span) {
        if !self.config.checks_unique_names() {
            return;
        }
        let Some(file) = self.filename.clone() else {
            return;
        };
        // Bundlers may compile one file several times (client and server).
        if self.session.is_file_seen(&file) {
            return;
        }
        let line = self.line_of(span);
        if let Err(err) = self.session.register_name(name, &file, line) {
            self.error = Some((err, span));
        }
    }

    fn resolve_name(&self, variable: &str) -> String {
        let generated = match (&self.config.generate_name, &self.filename) {
            (Some(generate), Some(filename)) => (**generate)(&NameContext {
                filename,
                variable_name: variable,
            }),
            _ => None,
        };
        generated
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| variable.to_string())
    }

    // ---------- classification ----------

    fn classify_declarator(&self, d: &VarDeclarator) -> CallShape {
        let Some(factory) = &self.factory_import else {
            return CallShape::Unsupported;
        };
        if self.filename.is_none() {
            return CallShape::Unsupported;
        }
        let Some(binding) = d.name.as_ident() else {
            return CallShape::Unsupported;
        };
        let Some(Expr::Call(call)) = d.init.as_deref() else {
            return CallShape::Unsupported;
        };
        let Callee::Expr(callee) = &call.callee else {
            return CallShape::Unsupported;
        };
        match &**callee {
            Expr::Ident(i) if i.sym == factory.sym => {}
            _ => return CallShape::Unsupported,
        }

        let variable = binding.id.sym.to_string();
        match call.args.first() {
            None => CallShape::BareFactoryCall {
                variable,
                arg: FactoryArg::Missing,
            },
            Some(ExprOrSpread { spread: None, expr }) => match &**expr {
                Expr::Object(obj) => match literal_name(obj) {
                    Some(name) if !name.is_empty() => CallShape::NamedFactoryCall { name },
                    _ => CallShape::BareFactoryCall {
                        variable,
                        arg: FactoryArg::Object,
                    },
                },
                _ => CallShape::Unsupported,
            },
            Some(_) => CallShape::Unsupported,
        }
    }

    fn classify_expr(&self, e: &Expr) -> CallShape {
        let (Some(css), Expr::TaggedTpl(tagged)) = (&self.css_import, e) else {
            return CallShape::Unsupported;
        };
        match &*tagged.tag {
            Expr::Ident(tag) if tag.sym == css.sym => CallShape::TaggedCssTemplate,
            _ => CallShape::Unsupported,
        }
    }

    // ---------- rewrites ----------

    fn name_factory_call(&mut self, d: &mut VarDeclarator, shape: CallShape) {
        let Some(Expr::Call(call)) = d.init.as_deref_mut() else {
            return;
        };
        match shape {
            CallShape::NamedFactoryCall { name } => self.assert_unique_name(&name, call.span),
            CallShape::BareFactoryCall { variable, arg: kind } => {
                let name = self.resolve_name(&variable);
                self.assert_unique_name(&name, call.span);
                if self.error.is_some() {
                    return;
                }
                match kind {
                    FactoryArg::Missing => {
                        call.args.insert(
                            0,
                            arg(Box::new(Expr::Object(ObjectLit {
                                span: DUMMY_SP,
                                props: vec![name_prop(&name)],
                            }))),
                        );
                    }
                    FactoryArg::Object => {
                        if let Some(Expr::Object(obj)) =
                            call.args.first_mut().map(|a| &mut *a.expr)
                        {
                            obj.props.insert(0, name_prop(&name));
                        }
                    }
                }
            }
            CallShape::TaggedCssTemplate | CallShape::Unsupported => {}
        }
    }

    /// `css\`a ${b} c\`` -> `css(["a ", b, " c"].join(""), "<source map>")`
    fn rewrite_css_template(&mut self, tagged: &TaggedTpl) -> Expr {
        let mut tokens = template_tokens(&tagged.tpl);

        if self.config.options.precompile {
            let source = tokens.concat();
            tokens = self
                .session
                .compile_css(&source, self.config.compiler.as_ref());
        }

        let elems = tokens
            .into_iter()
            .map(|token| {
                let expr = match placeholder_index(&token).and_then(|i| tagged.tpl.exprs.get(i)) {
                    Some(expr) => expr.clone(),
                    None => str_lit(token),
                };
                Some(arg(expr))
            })
            .collect();

        let joined = Expr::Call(CallExpr {
            span: DUMMY_SP,
            callee: Callee::Expr(Box::new(Expr::Member(MemberExpr {
                span: DUMMY_SP,
                obj: Box::new(Expr::Array(ArrayLit {
                    span: DUMMY_SP,
                    elems,
                })),
                prop: MemberProp::Ident(IdentName::new("join".into(), DUMMY_SP)),
            }))),
            args: vec![arg(str_lit(""))],
            type_args: None,
            ctxt: SyntaxContext::empty(),
        });

        let source_map = if self.config.emits_source_maps() {
            self.source_map_comment(tagged.span)
        } else {
            String::new()
        };

        Expr::Call(CallExpr {
            span: tagged.span,
            callee: Callee::Expr(tagged.tag.clone()),
            args: vec![arg(Box::new(joined)), arg(str_lit(source_map))],
            type_args: None,
            ctxt: SyntaxContext::empty(),
        })
    }
}

impl VisitMut for BemedTransform<'_> {
    noop_visit_mut_type!();

    fn visit_mut_module(&mut self, m: &mut Module) {
        self.enter_file();
        m.visit_mut_children_with(self);
        self.exit_file();
    }

    fn visit_mut_script(&mut self, s: &mut Script) {
        self.enter_file();
        s.visit_mut_children_with(self);
        self.exit_file();
    }

    fn visit_mut_import_decl(&mut self, n: &mut ImportDecl) {
        let source = n.src.value.to_string();

        if source == self.config.options.target {
            for s in &n.specifiers {
                if let ImportSpecifier::Named(named) = s {
                    if imported_name(named) == CSS_IMPORT {
                        self.css_import = Some(named.local.clone());
                    }
                }
            }
            if self.config.options.precompile {
                let precompiled = self.config.options.precompiled_target();
                tracing::debug!("rewriting import {source} to {precompiled}");
                n.src = Box::new(Str {
                    span: n.src.span,
                    value: precompiled.into(),
                    raw: None,
                });
            }
        }

        if source == FACTORY_MODULE {
            for s in &n.specifiers {
                if let ImportSpecifier::Named(named) = s {
                    if imported_name(named) == FACTORY_IMPORT {
                        self.factory_import = Some(named.local.clone());
                    }
                }
            }
        }
    }

    fn visit_mut_var_declarator(&mut self, d: &mut VarDeclarator) {
        if self.error.is_some() {
            return;
        }
        let shape = self.classify_declarator(d);
        if shape != CallShape::Unsupported {
            self.name_factory_call(d, shape);
        }
        if self.error.is_none() {
            d.visit_mut_children_with(self);
        }
    }

    fn visit_mut_expr(&mut self, e: &mut Expr) {
        if self.error.is_some() {
            return;
        }
        e.visit_mut_children_with(self);
        if self.classify_expr(e) != CallShape::TaggedCssTemplate {
            return;
        }
        if let Expr::TaggedTpl(tagged) = e {
            let rewritten = self.rewrite_css_template(tagged);
            *e = rewritten;
        }
    }
}

/// Run the transform over one program with `session` as build-wide state.
pub fn transform_program(
    program: &mut Program,
    config: &BemedConfig,
    session: &mut BuildSession,
    filename: Option<String>,
    source_map: Option<Lrc<dyn SourceMapper>>,
) -> Result<(), TransformError> {
    let mut transform = BemedTransform::new(config, session, filename, source_map);
    program.visit_mut_with(&mut transform);
    transform.into_result()
}
