use crate::{
    constructor::ObjectConstructor,
    encoding::WireEncoding,
    error::{Error, Result},
    idl::{Idl, IdlFunction, IdlLoader, StaticIdlLoader},
    native::{erase, DynamicNativeFunction, NativeFunction},
    protocol::{FunctionEncoding, ProtocolGenerator, TypeMapping},
    types::Type,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};
use tracing::{debug, warn};

/// Registry of native functions callable by their qualified IDL name.
///
/// IDL documents are loaded with [`load_idl`](Self::load_idl); functions declared in
/// them can then be registered with [`register_function`](Self::register_function)
/// together with the type mapping describing their wire layout.
pub struct FunctionMapping {
    loader: Box<dyn IdlLoader>,
    loaded: BTreeSet<String>,
    idl: Idl,
    generator: ProtocolGenerator,
    functions: BTreeMap<String, RegisteredFunction>,
}

impl Default for FunctionMapping {
    fn default() -> Self {
        Self::with_loader(StaticIdlLoader::builtin())
    }
}

impl FunctionMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: impl IdlLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            loaded: BTreeSet::new(),
            idl: Idl::new(),
            generator: ProtocolGenerator::new(),
            functions: BTreeMap::new(),
        }
    }

    /// Loading a URI a second time does nothing.
    pub fn load_idl(&mut self, uri: &str) -> Result<()> {
        if self.loaded.contains(uri) {
            return Ok(());
        }
        let idl = self.loader.load(uri)?;
        debug!(
            uri,
            types = idl.types.len(),
            services = idl.services.len(),
            "loaded IDL"
        );
        self.idl.merge(idl);
        self.loaded.insert(uri.to_owned());
        Ok(())
    }

    pub fn idl(&self) -> &Idl {
        &self.idl
    }

    pub fn resolve_type(&self, name: &str) -> Result<Type> {
        self.idl.resolve_type(name)
    }

    pub fn define_type_mapping(&mut self, id: &str, mapping: TypeMapping) {
        self.generator.define(id, mapping);
    }

    /// Compiles the type mapping known as `id`.
    pub fn encoding(&self, id: &str) -> Result<FunctionEncoding> {
        self.generator.generate(id)
    }

    pub fn declaration(&self, qualified_name: &str) -> Result<&IdlFunction> {
        self.idl
            .function(qualified_name)
            .map(|(_, function)| function)
            .ok_or_else(|| Error::UnknownIdlFunction(qualified_name.to_owned()))
    }

    /// Registers `native` as the implementation of the IDL function `qualified_name`,
    /// replacing any earlier registration under that name.
    pub fn register_function<F>(
        &mut self,
        qualified_name: &str,
        native: F,
        type_mapping: &str,
    ) -> Result<()>
    where
        F: NativeFunction + 'static,
    {
        let declared_params = self.declaration(qualified_name)?.params.len();
        let encoding = self.generator.generate(type_mapping)?;
        let native = erase(native);

        let domain = native.domain();
        if domain.len() != declared_params {
            return Err(Error::IncompatibleNativeType(format!(
                "{qualified_name} declares {declared_params} parameters, native function takes {}",
                domain.len()
            )));
        }
        let mut per_param: Vec<Vec<WireEncoding>> = vec![Vec::new(); domain.len()];
        for entry in &encoding.args {
            let (param, entry) = entry.split_parameter()?;
            per_param
                .get_mut(param)
                .ok_or_else(|| {
                    Error::IncompatibleNativeType(format!(
                        "type mapping {type_mapping} addresses parameter {param} of {qualified_name}"
                    ))
                })?
                .push(entry);
        }
        // Every path must resolve against the native types.
        for (entries, ty) in per_param.iter().zip(domain) {
            ObjectConstructor::sketch(entries, ty)?;
        }
        ObjectConstructor::sketch(&encoding.result, native.range())?;

        debug!(name = qualified_name, type_mapping, "registered function");
        let previous = self.functions.insert(
            qualified_name.to_owned(),
            RegisteredFunction {
                native,
                type_mapping: type_mapping.to_owned(),
                encoding: Rc::new(encoding),
            },
        );
        if previous.is_some() {
            warn!(name = qualified_name, "replaced previous registration");
        }
        Ok(())
    }

    pub fn unregister_function(&mut self, qualified_name: &str) -> Result<()> {
        self.functions
            .remove(qualified_name)
            .map(|_| ())
            .ok_or_else(|| Error::UnknownIdlFunction(qualified_name.to_owned()))
    }

    pub fn function(&self, qualified_name: &str) -> Option<&RegisteredFunction> {
        self.functions.get(qualified_name)
    }
}

/// A native function together with its compiled wire layout. Cloning is cheap.
#[derive(Clone)]
pub struct RegisteredFunction {
    native: Rc<dyn DynamicNativeFunction>,
    type_mapping: String,
    encoding: Rc<FunctionEncoding>,
}

impl RegisteredFunction {
    pub fn type_mapping(&self) -> &str {
        &self.type_mapping
    }

    pub fn args_encoding(&self) -> &[WireEncoding] {
        &self.encoding.args
    }

    pub fn result_encoding(&self) -> &[WireEncoding] {
        &self.encoding.result
    }

    pub fn domain(&self) -> &[Type] {
        self.native.domain()
    }

    pub fn range(&self) -> &Type {
        self.native.range()
    }

    pub(crate) fn native(&self) -> Rc<dyn DynamicNativeFunction> {
        self.native.clone()
    }
}
