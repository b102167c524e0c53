pub mod languages;
pub mod ocr;
