//! Registry response fixtures

use serde_json::{json, Value};

/// `DecodeVinValuesExtended` for WP0AA29936S715303 (every essential field set)
pub fn porsche_decode_payload() -> Value {
    json!({
        "Count": 1,
        "Message": "Results returned successfully. NOTE: Any missing decoded values should be interpreted as NHTSA does not have data on the specific variable.",
        "SearchCriteria": "VIN:WP0AA29936S715303",
        "Results": [{
            "ABS": "",
            "BodyClass": "Coupe",
            "DisplacementL": "3.6",
            "Doors": "2",
            "DriveType": "RWD/Rear-Wheel Drive",
            "EngineCylinders": "6",
            "ErrorCode": "0",
            "ErrorText": "0 - VIN decoded clean. Check Digit (9th position) is correct",
            "FuelTypePrimary": "Gasoline",
            "Make": "PORSCHE",
            "Manufacturer": "DR. ING. H.C.F. PORSCHE AG",
            "Model": "911",
            "ModelYear": "2006",
            "PlantCity": "STUTTGART",
            "PlantCountry": "GERMANY",
            "Series": "Carrera",
            "Trim": "",
            "Turbo": "Not Applicable",
            "VIN": "WP0AA29936S715303"
        }]
    })
}

/// `DecodeVinValuesExtended` for 1HGCM82633A123456 (DriveType and PlantCity unknown)
pub fn honda_decode_payload() -> Value {
    json!({
        "Count": 1,
        "Message": "Results returned successfully",
        "SearchCriteria": "VIN:1HGCM82633A123456",
        "Results": [{
            "BodyClass": "Coupe",
            "DisplacementL": "3.0",
            "DriveType": "",
            "EngineCylinders": "6",
            "ErrorCode": "1",
            "ErrorText": "1 - Check Digit (9th position) does not calculate properly",
            "FuelTypePrimary": "Gasoline",
            "Make": "HONDA",
            "Manufacturer": "AMERICAN HONDA MOTOR CO., INC.",
            "Model": "Accord",
            "ModelYear": "2003",
            "PlantCity": "",
            "PlantCountry": "UNITED STATES (USA)",
            "VIN": "1HGCM82633A123456"
        }]
    })
}

/// Generic successful enhancement response
pub fn enhancement_payload(label: &str) -> Value {
    json!({
        "Count": 1,
        "Message": "Response returned successfully",
        "SearchCriteria": label,
        "Results": [{ "Name": label }]
    })
}
