use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, SourceMap, SourceMapper};
use swc_core::ecma::ast::Program;
use swc_core::ecma::codegen::{text_writer::JsWriter, Config, Emitter};
use swc_core::ecma::parser::lexer::Lexer;
use swc_core::ecma::parser::{EsSyntax, Parser, StringInput, Syntax};

use crate::config::BemedConfig;
use crate::error::TransformError;
use crate::session::BuildSession;
use crate::transform::transform_program;

/// Parse an ECMAScript + JSX module into a fresh source map.
pub fn parse_program(
    code: &str,
    filename: &str,
) -> Result<(Program, Lrc<SourceMap>), TransformError> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        code.to_string(),
    );
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax {
            jsx: true,
            ..Default::default()
        }),
        Default::default(),
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let module = parser.parse_module().map_err(|e| TransformError::Parse {
        file: filename.to_string(),
        message: e.kind().msg().to_string(),
    })?;
    if let Some(e) = parser.take_errors().into_iter().next() {
        return Err(TransformError::Parse {
            file: filename.to_string(),
            message: e.kind().msg().to_string(),
        });
    }

    Ok((Program::Module(module), cm))
}

pub fn print_program(program: &Program, cm: &Lrc<SourceMap>) -> Result<String, TransformError> {
    let mut buf = Vec::new();
    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, None);
        let mut emitter = Emitter {
            cfg: Config::default(),
            comments: None,
            cm: cm.clone(),
            wr: writer,
        };
        match program {
            Program::Module(module) => emitter.emit_module(module)?,
            Program::Script(script) => emitter.emit_script(script)?,
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Rewrite one source file and print it back.
///
/// Build `config` with [`BemedConfig::from_process_env`] to honour `NODE_ENV`
/// and `BEMED_DISABLE_DUPLICATE_DETECTION`.
pub fn transform_source(
    code: &str,
    filename: &str,
    config: &BemedConfig,
    session: &mut BuildSession,
) -> Result<String, TransformError> {
    let (mut program, cm) = parse_program(code, filename)?;
    let mapper: Lrc<dyn SourceMapper> = cm.clone();
    transform_program(
        &mut program,
        config,
        session,
        Some(filename.to_string()),
        Some(mapper),
    )?;
    print_program(&program, &cm)
}
