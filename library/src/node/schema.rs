//! Node type declaration for the contact sheet selector.

/// Data type carried by a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDataType {
    Image,
}

/// Whether a pin is an input or an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

/// Definition of one input or output pin.
#[derive(Debug, Clone)]
pub struct PinDefinition {
    pub name: String,
    pub display_name: String,
    pub direction: PinDirection,
    pub data_type: PinDataType,
}

impl PinDefinition {
    pub fn input(name: &str, display_name: &str, data_type: PinDataType) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            direction: PinDirection::Input,
            data_type,
        }
    }

    pub fn output(name: &str, display_name: &str, data_type: PinDataType) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            direction: PinDirection::Output,
            data_type,
        }
    }
}

/// Integer parameter surfaced to the host UI.
#[derive(Debug, Clone)]
pub struct IntParameter {
    pub name: String,
    pub default: i64,
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub tooltip: String,
    /// Evaluated lazily by the host: changing it alone does not force a rerun.
    pub lazy: bool,
}

/// Definition of the node type, registered with the host engine.
#[derive(Debug, Clone)]
pub struct NodeTypeDefinition {
    pub type_id: String,
    pub display_name: String,
    pub category: String,
    pub description: String,
    pub inputs: Vec<PinDefinition>,
    pub outputs: Vec<PinDefinition>,
    pub int_parameters: Vec<IntParameter>,
}

impl NodeTypeDefinition {
    pub fn new(type_id: &str, display_name: &str, category: &str) -> Self {
        Self {
            type_id: type_id.to_string(),
            display_name: display_name.to_string(),
            category: category.to_string(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            int_parameters: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<PinDefinition>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<PinDefinition>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_int_parameters(mut self, parameters: Vec<IntParameter>) -> Self {
        self.int_parameters = parameters;
        self
    }
}

/// Declaration for the contact sheet selector node.
pub fn node_definition() -> NodeTypeDefinition {
    NodeTypeDefinition::new(
        super::DEFAULT_NODE_ID,
        "Contact Sheet Selector",
        "image/batch",
    )
    .with_description(
        "Display the incoming batch as a contact sheet and let the user choose \
         which images should be forwarded on the next execution.",
    )
    .with_inputs(vec![PinDefinition::input(
        "images",
        "Images",
        PinDataType::Image,
    )])
    .with_outputs(vec![PinDefinition::output(
        "selected_images",
        "Selected Images",
        PinDataType::Image,
    )])
    .with_int_parameters(vec![IntParameter {
        name: "columns".to_string(),
        default: 0,
        min: 0,
        max: 12,
        step: 1,
        tooltip: "Number of columns to display in the contact sheet (0 = auto).".to_string(),
        lazy: true,
    }])
}
